use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::status::StatusReporter;

/// Report table: one row per product item id, fixed header order.
pub const REPORT_TABLE: &str = "SA360 Shopping Report";
pub const REPORT_HEADERS: [&str; 6] = [
    "productItemId",
    "cost_micros",
    "clicks",
    "ctr",
    "conversions",
    "average_cpc",
];

/// Label table: one `(productItemId, custom_label0)` row per report row.
pub const LABEL_TABLE: &str = "Product Feed Custom Labeling";
pub const LABEL_HEADERS: [&str; 2] = ["productItemId", "custom_label0"];

pub const BATCH_SIZE: usize = 100;

/// A named table in the in-memory sink: a header row plus data rows.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    fn clear(&mut self) {
        self.headers.clear();
        self.rows.clear();
    }
}

/// The in-memory tabular sink: named tables, created on demand, each fully
/// replaced (cleared then rewritten) on every run.
#[derive(Debug, Default, Serialize)]
#[serde(transparent)]
pub struct Workbook {
    tables: BTreeMap<String, Table>,
}

impl Workbook {
    pub fn new() -> Workbook {
        Workbook::default()
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn get_or_create(&mut self, name: &str) -> &mut Table {
        self.tables.entry(name.to_string()).or_default()
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.tables.iter().map(|(name, table)| (name.as_str(), table))
    }
}

/// Streams rows into a named table in fixed-size batches so a write never
/// holds more than one batch beyond the accumulated sink contents. The batch
/// boundary is a write-efficiency device only: row order in the sink always
/// equals input order.
pub struct BatchedTableWriter {
    batch_size: usize,
}

impl Default for BatchedTableWriter {
    fn default() -> Self {
        BatchedTableWriter::new()
    }
}

impl BatchedTableWriter {
    pub fn new() -> BatchedTableWriter {
        BatchedTableWriter {
            batch_size: BATCH_SIZE,
        }
    }

    pub fn with_batch_size(batch_size: usize) -> BatchedTableWriter {
        debug_assert!(batch_size > 0);
        BatchedTableWriter { batch_size }
    }

    /// Clear the named table and write `headers` plus `rows` into it,
    /// announcing `(written_so_far, total)` after each batch.
    ///
    /// Zero rows is an error condition, checked before the clear step: on
    /// `EmptyResult` the sink keeps its prior content. A failure after the
    /// clear leaves a cleared-but-incomplete table (at-most-once policy).
    pub fn write(
        &self,
        book: &mut Workbook,
        headers: &[&str],
        rows: Vec<Vec<String>>,
        table_name: &str,
        status: &mut dyn StatusReporter,
    ) -> Result<()> {
        if rows.is_empty() {
            return Err(Error::EmptyResult(table_name.to_string()));
        }

        let total = rows.len();
        let table = book.get_or_create(table_name);
        table.clear();
        table.headers = headers.iter().map(|h| h.to_string()).collect();

        let mut written = 0;
        let mut rows = rows.into_iter();
        loop {
            let batch: Vec<Vec<String>> = rows.by_ref().take(self.batch_size).collect();
            if batch.is_empty() {
                break;
            }
            written += batch.len();
            table.rows.extend(batch);
            status.progress(written, total);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metric;
    use crate::status::RecordingReporter;

    fn numbered_rows(count: usize) -> Vec<Vec<String>> {
        (0..count).map(|i| vec![format!("row-{i}")]).collect()
    }

    #[test]
    fn report_headers_follow_metric_column_order() {
        assert_eq!(REPORT_HEADERS[0], "productItemId");
        for (header, metric) in REPORT_HEADERS[1..].iter().zip(Metric::ALL) {
            assert_eq!(*header, metric.column());
        }
    }

    #[test]
    fn rows_arrive_in_input_order_regardless_of_batch_size() {
        for batch_size in [1, 100, 1000] {
            let mut book = Workbook::new();
            let mut status = RecordingReporter::new();
            BatchedTableWriter::with_batch_size(batch_size)
                .write(&mut book, &["id"], numbered_rows(250), REPORT_TABLE, &mut status)
                .unwrap();

            let table = book.table(REPORT_TABLE).unwrap();
            assert_eq!(table.rows.len(), 250, "batch size {batch_size}");
            for (i, row) in table.rows.iter().enumerate() {
                assert_eq!(row[0], format!("row-{i}"));
            }
        }
    }

    #[test]
    fn progress_is_announced_after_each_batch() {
        let mut book = Workbook::new();
        let mut status = RecordingReporter::new();
        BatchedTableWriter::with_batch_size(100)
            .write(&mut book, &["id"], numbered_rows(250), REPORT_TABLE, &mut status)
            .unwrap();

        assert_eq!(status.progress, vec![(100, 250), (200, 250), (250, 250)]);
    }

    #[test]
    fn write_replaces_prior_content() {
        let mut book = Workbook::new();
        let mut status = RecordingReporter::new();
        let writer = BatchedTableWriter::new();

        writer
            .write(&mut book, &["old"], numbered_rows(5), REPORT_TABLE, &mut status)
            .unwrap();
        writer
            .write(&mut book, &["new"], numbered_rows(2), REPORT_TABLE, &mut status)
            .unwrap();

        let table = book.table(REPORT_TABLE).unwrap();
        assert_eq!(table.headers, vec!["new"]);
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn empty_rows_error_before_the_clear_step() {
        let mut book = Workbook::new();
        let mut status = RecordingReporter::new();
        let writer = BatchedTableWriter::new();

        writer
            .write(&mut book, &["id"], numbered_rows(3), REPORT_TABLE, &mut status)
            .unwrap();

        let err = writer
            .write(&mut book, &["id"], Vec::new(), REPORT_TABLE, &mut status)
            .unwrap_err();
        assert!(matches!(err, Error::EmptyResult(name) if name == REPORT_TABLE));

        // Prior content is untouched: the empty check precedes the clear.
        let table = book.table(REPORT_TABLE).unwrap();
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.headers, vec!["id"]);
    }

    #[test]
    fn empty_rows_error_on_a_missing_table_creates_nothing() {
        let mut book = Workbook::new();
        let mut status = RecordingReporter::new();
        let err = BatchedTableWriter::new()
            .write(&mut book, &["id"], Vec::new(), LABEL_TABLE, &mut status)
            .unwrap_err();
        assert!(matches!(err, Error::EmptyResult(_)));
        assert!(book.table(LABEL_TABLE).is_none());
    }
}
