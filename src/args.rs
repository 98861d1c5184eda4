use std::path::PathBuf;

use clap::Args;

#[derive(Debug, Clone, Args)]
pub struct BaseArgs {
    /// Output as JSON
    #[arg(short = 'j', long, global = true)]
    pub json: bool,

    /// Override the configured customer id (or via SAL_CUSTOMER_ID)
    #[arg(long, env = "SAL_CUSTOMER_ID", global = true)]
    pub customer_id: Option<String>,

    /// Bearer token for the reporting API (or via SAL_ACCESS_TOKEN)
    #[arg(long, env = "SAL_ACCESS_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Override the API service root (or via SAL_API_URL)
    #[arg(long, env = "SAL_API_URL", hide_env_values = true, global = true)]
    pub api_url: Option<String>,

    /// Append run-log lines to this file instead of the default location
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Path to a .env file to load before running commands.
    #[arg(long, env = "SAL_ENV_FILE", hide_env_values = true)]
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct CLIArgs<T: Args> {
    #[command(flatten)]
    pub base: BaseArgs,

    #[command(flatten)]
    pub args: T,
}
