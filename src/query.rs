use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::metrics::Metric;

const REPORT_VIEW: &str = "shopping_performance_view";
const SEGMENT_KEY_FIELD: &str = "segments.product_item_id";
const DATE_FIELD: &str = "segments.date";

/// Builds the shopping report query from the fixed field list and optional
/// inclusive date bounds. The produced string is immutable once built.
#[derive(Debug, Clone, Default)]
pub struct ReportQuery {
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

impl ReportQuery {
    pub fn new(start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        ReportQuery {
            start_date,
            end_date,
        }
    }

    /// Assemble the query string. Supplying only one bound simply omits the
    /// other clause; a start date after the end date is a configuration
    /// error, not a runtime one.
    pub fn build(&self) -> Result<String> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(Error::config(format!(
                    "start date ({start}) must not be after end date ({end})"
                )));
            }
        }

        let mut fields = vec![SEGMENT_KEY_FIELD.to_string()];
        fields.extend(Metric::ALL.iter().map(|m| m.field().to_string()));

        let mut query = format!(
            "SELECT {} FROM {REPORT_VIEW} WHERE {SEGMENT_KEY_FIELD} != 'undefined'",
            fields.join(", ")
        );
        if let Some(start) = self.start_date {
            query.push_str(&format!(" AND {DATE_FIELD} >= '{}'", start.format("%Y-%m-%d")));
        }
        if let Some(end) = self.end_date {
            query.push_str(&format!(" AND {DATE_FIELD} <= '{}'", end.format("%Y-%m-%d")));
        }
        query.push_str(&format!(" ORDER BY {SEGMENT_KEY_FIELD}"));
        Ok(query)
    }
}
