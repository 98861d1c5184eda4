use anyhow::Result;
use clap::Args;

use crate::args::BaseArgs;
use crate::config::{self, RunSettings};
use crate::http::ApiClient;
use crate::metrics::ReportRow;
use crate::sa360;
use crate::status::{Phase, RunLog, RunStatus, StatusReporter};
use crate::store::{BatchedTableWriter, Workbook, REPORT_HEADERS, REPORT_TABLE};
use crate::ui;

#[derive(Debug, Clone, Args)]
pub struct ReportArgs {
    /// Inclusive report start date (YYYY-MM-DD); overrides the configured one
    #[arg(long)]
    pub start_date: Option<String>,

    /// Inclusive report end date (YYYY-MM-DD); overrides the configured one
    #[arg(long)]
    pub end_date: Option<String>,
}

/// Extraction-only entry point: fetch the report, persist it, finish.
pub async fn run(base: BaseArgs, args: ReportArgs) -> Result<()> {
    let config = config::load()?;
    let settings = config::resolve_run(
        &base,
        args.start_date.as_deref(),
        args.end_date.as_deref(),
        &config,
    )?;

    let mut status = open_status(&settings)?;
    let mut book = Workbook::new();

    match extract_to_store(&settings, &mut book, &mut status).await {
        Ok(()) => {
            status.transition(Phase::Finished);
            render(&base, &book)
        }
        Err(err) => {
            status.record_error(&err);
            Err(err.into())
        }
    }
}

pub(crate) fn open_status(settings: &RunSettings) -> Result<RunStatus> {
    let log = match &settings.log_file {
        Some(path) => RunLog::open(path)?,
        None => RunLog::disabled(),
    };
    Ok(RunStatus::new(log))
}

/// Extraction leg shared by `sal report` and `sal label`: announce the run,
/// drain the paginated search and stream the rows into the report table.
pub(crate) async fn extract_to_store(
    settings: &RunSettings,
    book: &mut Workbook,
    status: &mut dyn StatusReporter,
) -> crate::error::Result<()> {
    status.transition(Phase::Started);
    let client = ApiClient::new(&settings.api_url, &settings.access_token);

    status.transition(Phase::Extracting);
    let rows = sa360::extract(
        &client,
        &settings.customer_id,
        settings.start_date,
        settings.end_date,
    )
    .await?;

    let cells: Vec<Vec<String>> = rows.iter().map(ReportRow::to_cells).collect();
    BatchedTableWriter::new().write(book, &REPORT_HEADERS, cells, REPORT_TABLE, status)
}

pub(crate) fn render(base: &BaseArgs, book: &Workbook) -> Result<()> {
    if base.json {
        println!("{}", serde_json::to_string_pretty(book)?);
    } else {
        for (name, table) in book.tables() {
            println!("{}", ui::render_table(name, table));
        }
    }
    Ok(())
}
