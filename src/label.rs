use anyhow::Result;
use clap::Args;

use crate::args::BaseArgs;
use crate::config::{self, RuleSettings, RunSettings};
use crate::error::Error;
use crate::metrics::parse_metric_cell;
use crate::report::{self, ReportArgs};
use crate::rule;
use crate::status::{Phase, StatusReporter};
use crate::store::{BatchedTableWriter, Workbook, LABEL_HEADERS, LABEL_TABLE, REPORT_TABLE};

#[derive(Debug, Clone, Args)]
pub struct LabelArgs {
    #[command(flatten)]
    pub report: ReportArgs,

    /// Condition name, e.g. "Greater than or equal to"
    #[arg(long)]
    pub condition: Option<String>,

    /// Metric column the condition tests
    #[arg(long)]
    pub control_column: Option<String>,

    /// First (or lower) threshold
    #[arg(long)]
    pub threshold1: Option<f64>,

    /// Upper threshold, read only by "Is between"
    #[arg(long)]
    pub threshold2: Option<f64>,

    /// Label text assigned to matching products
    #[arg(long)]
    pub label: Option<String>,
}

/// Combined entry point: extract the report, then assign custom labels.
pub async fn run(base: BaseArgs, args: LabelArgs) -> Result<()> {
    let config = config::load()?;
    let settings = config::resolve_run(
        &base,
        args.report.start_date.as_deref(),
        args.report.end_date.as_deref(),
        &config,
    )?;
    let rule = config::resolve_rule(
        args.condition.as_deref(),
        args.control_column.as_deref(),
        args.threshold1,
        args.threshold2,
        args.label.as_deref(),
        &config,
    )?;

    let mut status = report::open_status(&settings)?;
    let mut book = Workbook::new();

    match run_pipeline(&settings, &rule, &mut book, &mut status).await {
        Ok(()) => {
            status.transition(Phase::Finished);
            report::render(&base, &book)
        }
        Err(err) => {
            status.record_error(&err);
            Err(err.into())
        }
    }
}

async fn run_pipeline(
    settings: &RunSettings,
    rule: &RuleSettings,
    book: &mut Workbook,
    status: &mut crate::status::RunStatus,
) -> crate::error::Result<()> {
    report::extract_to_store(settings, book, status).await?;
    label_products(book, rule, status)
}

/// Announce the labeling phase, evaluate the rule over every report row and
/// write the label table. Every report row yields exactly one label row:
/// the configured label on match, the empty string otherwise.
pub fn label_products(
    book: &mut Workbook,
    rule: &RuleSettings,
    status: &mut dyn StatusReporter,
) -> crate::error::Result<()> {
    status.transition(Phase::Labeling);
    let labeled = apply_rule(book, rule)?;
    BatchedTableWriter::new().write(book, &LABEL_HEADERS, labeled, LABEL_TABLE, status)
}

/// Re-parse the persisted report table by its fixed header order and produce
/// one `[productItemId, label-or-empty]` row per report row. A missing
/// (`N/A`) control value never matches.
fn apply_rule(book: &Workbook, rule: &RuleSettings) -> crate::error::Result<Vec<Vec<String>>> {
    let table = book
        .table(REPORT_TABLE)
        .ok_or_else(|| Error::config("the report table has not been written yet"))?;

    let control_column = rule.control_column.column();
    let control_index = table
        .headers
        .iter()
        .position(|h| h == control_column)
        .ok_or_else(|| {
            Error::config(format!("the report table has no {control_column:?} column"))
        })?;

    let mut labeled = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let product_item_id = row.first().cloned().unwrap_or_default();
        let control_value = row
            .get(control_index)
            .map(String::as_str)
            .and_then(parse_metric_cell);

        let matched = match control_value {
            Some(value) => rule::evaluate(rule.condition, value, rule.threshold1, rule.threshold2)?,
            None => false,
        };

        let label = if matched {
            rule.label.clone()
        } else {
            String::new()
        };
        labeled.push(vec![product_item_id, label]);
    }
    Ok(labeled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuleError;
    use crate::metrics::Metric;
    use crate::rule::Condition;
    use crate::status::RecordingReporter;
    use crate::store::REPORT_HEADERS;

    fn rule(condition: Condition, control: Metric, t1: f64, t2: f64, label: &str) -> RuleSettings {
        RuleSettings {
            condition,
            control_column: control,
            threshold1: t1,
            threshold2: t2,
            label: label.to_string(),
        }
    }

    fn report_book(rows: Vec<Vec<String>>) -> Workbook {
        let mut book = Workbook::new();
        let mut status = RecordingReporter::new();
        BatchedTableWriter::new()
            .write(&mut book, &REPORT_HEADERS, rows, REPORT_TABLE, &mut status)
            .unwrap();
        book
    }

    fn report_row(id: &str, cost_micros: &str) -> Vec<String> {
        vec![
            id.to_string(),
            cost_micros.to_string(),
            "3".to_string(),
            "0.05".to_string(),
            "1".to_string(),
            "120000".to_string(),
        ]
    }

    #[test]
    fn high_cost_scenario() {
        let mut book = report_book(vec![
            report_row("A", "2000000"),
            report_row("B", "500000"),
        ]);
        let rule = rule(
            Condition::GreaterThanOrEqual,
            Metric::CostMicros,
            1_000_000.0,
            0.0,
            "HIGH_COST",
        );
        let mut status = RecordingReporter::new();

        label_products(&mut book, &rule, &mut status).unwrap();

        let table = book.table(LABEL_TABLE).unwrap();
        assert_eq!(table.headers, vec!["productItemId", "custom_label0"]);
        assert_eq!(
            table.rows,
            vec![
                vec!["A".to_string(), "HIGH_COST".to_string()],
                vec!["B".to_string(), String::new()],
            ]
        );
        assert_eq!(status.transitions, vec![Phase::Labeling]);
    }

    #[test]
    fn every_report_row_yields_exactly_one_label_row() {
        let rows: Vec<Vec<String>> = (0..137)
            .map(|i| report_row(&format!("sku-{i}"), &format!("{}", i * 10_000)))
            .collect();
        let mut book = report_book(rows);
        let rule = rule(Condition::GreaterThan, Metric::CostMicros, 500_000.0, 0.0, "X");
        let mut status = RecordingReporter::new();

        label_products(&mut book, &rule, &mut status).unwrap();

        let table = book.table(LABEL_TABLE).unwrap();
        assert_eq!(table.rows.len(), 137);
        for row in &table.rows {
            assert_eq!(row.len(), 2);
            assert!(row[1] == "X" || row[1].is_empty());
        }
    }

    #[test]
    fn missing_control_value_never_matches() {
        let mut row = report_row("A", "2000000");
        row[1] = "N/A".to_string();
        let mut book = report_book(vec![row]);
        // Even "less than infinity"-style conditions skip sentinel cells.
        let rule = rule(Condition::LessThan, Metric::CostMicros, f64::MAX, 0.0, "ANY");
        let mut status = RecordingReporter::new();

        label_products(&mut book, &rule, &mut status).unwrap();

        let table = book.table(LABEL_TABLE).unwrap();
        assert_eq!(table.rows, vec![vec!["A".to_string(), String::new()]]);
    }

    #[test]
    fn invalid_between_bounds_abort_labeling() {
        let mut book = report_book(vec![report_row("A", "2000000")]);
        let rule = rule(Condition::IsBetween, Metric::CostMicros, 10.0, 5.0, "X");
        let mut status = RecordingReporter::new();

        let err = label_products(&mut book, &rule, &mut status).unwrap_err();
        assert!(matches!(
            err,
            Error::Rule(RuleError::InvertedBounds { .. })
        ));
        // The label table is never written on failure.
        assert!(book.table(LABEL_TABLE).is_none());
    }

    #[test]
    fn labeling_requires_a_written_report_table() {
        let book = Workbook::new();
        let rule = rule(Condition::Equal, Metric::Clicks, 1.0, 0.0, "X");
        let err = apply_rule(&book, &rule).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn is_between_labels_only_strict_interior_rows() {
        let mut book = report_book(vec![
            report_row("low", "500000"),
            report_row("edge-lower", "1000000"),
            report_row("inside", "1500000"),
            report_row("edge-upper", "2000000"),
            report_row("high", "2500000"),
        ]);
        let rule = rule(
            Condition::IsBetween,
            Metric::CostMicros,
            1_000_000.0,
            2_000_000.0,
            "MID",
        );
        let mut status = RecordingReporter::new();

        label_products(&mut book, &rule, &mut status).unwrap();

        let labels: Vec<&str> = book
            .table(LABEL_TABLE)
            .unwrap()
            .rows
            .iter()
            .map(|row| row[1].as_str())
            .collect();
        assert_eq!(labels, vec!["", "", "MID", "", ""]);
    }
}
