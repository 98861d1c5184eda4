use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

use crate::error::Error;

/// Cell value written for a metric the API did not return. Distinct from a
/// numeric zero: zero means "no activity", the sentinel means "not returned".
pub const MISSING_METRIC: &str = "N/A";

/// The closed set of metric columns in the shopping report, in column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    CostMicros,
    Clicks,
    Ctr,
    Conversions,
    AverageCpc,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::CostMicros,
        Metric::Clicks,
        Metric::Ctr,
        Metric::Conversions,
        Metric::AverageCpc,
    ];

    /// Column name used in the report table header.
    pub fn column(&self) -> &'static str {
        match self {
            Metric::CostMicros => "cost_micros",
            Metric::Clicks => "clicks",
            Metric::Ctr => "ctr",
            Metric::Conversions => "conversions",
            Metric::AverageCpc => "average_cpc",
        }
    }

    /// Fully qualified field name used in the report query.
    pub fn field(&self) -> &'static str {
        match self {
            Metric::CostMicros => "metrics.cost_micros",
            Metric::Clicks => "metrics.clicks",
            Metric::Ctr => "metrics.ctr",
            Metric::Conversions => "metrics.conversions",
            Metric::AverageCpc => "metrics.average_cpc",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.column() == s)
            .ok_or_else(|| {
                Error::config(format!(
                    "unknown control column {s:?}; valid columns: {}",
                    Metric::ALL.map(|m| m.column()).join(", ")
                ))
            })
    }
}

/// A metric value as the REST API reports it. Google's JSON transcoding emits
/// int64 fields as strings, double fields as numbers; both parse to f64 here.
#[derive(Debug, Clone, Copy, PartialEq)]
struct MetricValue(f64);

impl<'de> Deserialize<'de> for MetricValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct NumberOrString;

        impl Visitor<'_> for NumberOrString {
            type Value = MetricValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON number or a string-encoded number")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(MetricValue(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(MetricValue(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(MetricValue(v as f64))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse::<f64>().map(MetricValue).map_err(|_| {
                    E::invalid_value(de::Unexpected::Str(v), &"a string-encoded number")
                })
            }
        }

        deserializer.deserialize_any(NumberOrString)
    }
}

/// Optional-valued metric bag for one result row, keyed by [`Metric`].
/// Metrics absent from the API response stay `None`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricSet {
    cost_micros: Option<MetricValue>,
    clicks: Option<MetricValue>,
    ctr: Option<MetricValue>,
    conversions: Option<MetricValue>,
    average_cpc: Option<MetricValue>,
}

impl MetricSet {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        let value = match metric {
            Metric::CostMicros => self.cost_micros,
            Metric::Clicks => self.clicks,
            Metric::Ctr => self.ctr,
            Metric::Conversions => self.conversions,
            Metric::AverageCpc => self.average_cpc,
        };
        value.map(|MetricValue(v)| v)
    }

    #[cfg(test)]
    pub fn from_values(values: [Option<f64>; 5]) -> Self {
        let [cost_micros, clicks, ctr, conversions, average_cpc] = values.map(|v| v.map(MetricValue));
        MetricSet {
            cost_micros,
            clicks,
            ctr,
            conversions,
            average_cpc,
        }
    }
}

/// One extracted report row: product item id plus its metric bag.
#[derive(Debug, Clone)]
pub struct ReportRow {
    pub product_item_id: String,
    pub metrics: MetricSet,
}

impl ReportRow {
    /// Render the row in report-table column order. Missing metrics become
    /// the [`MISSING_METRIC`] sentinel so column alignment is preserved.
    pub fn to_cells(&self) -> Vec<String> {
        let mut cells = Vec::with_capacity(1 + Metric::ALL.len());
        cells.push(self.product_item_id.clone());
        for metric in Metric::ALL {
            cells.push(match self.metrics.get(metric) {
                Some(value) => format_metric(value),
                None => MISSING_METRIC.to_string(),
            });
        }
        cells
    }
}

/// Integral values print without a trailing `.0` so cells read like the raw
/// API values (`"2000000"`, not `"2000000.0"`).
pub fn format_metric(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Parse a report-table cell back into an optional metric value. The sentinel
/// and anything non-numeric map to `None`.
pub fn parse_metric_cell(cell: &str) -> Option<f64> {
    if cell == MISSING_METRIC {
        return None;
    }
    cell.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_set_parses_numbers_and_strings() {
        let json = r#"{
            "costMicros": "2000000",
            "clicks": "14",
            "ctr": 0.034,
            "conversions": 2.5
        }"#;
        let metrics: MetricSet = serde_json::from_str(json).unwrap();
        assert_eq!(metrics.get(Metric::CostMicros), Some(2_000_000.0));
        assert_eq!(metrics.get(Metric::Clicks), Some(14.0));
        assert_eq!(metrics.get(Metric::Ctr), Some(0.034));
        assert_eq!(metrics.get(Metric::Conversions), Some(2.5));
        assert_eq!(metrics.get(Metric::AverageCpc), None);
    }

    #[test]
    fn metric_set_rejects_non_numeric_strings() {
        let err = serde_json::from_str::<MetricSet>(r#"{"clicks": "lots"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn missing_metrics_render_as_sentinel() {
        let row = ReportRow {
            product_item_id: "sku-1".into(),
            metrics: MetricSet::from_values([Some(2_000_000.0), None, Some(0.034), None, None]),
        };
        assert_eq!(
            row.to_cells(),
            vec!["sku-1", "2000000", "N/A", "0.034", "N/A", "N/A"]
        );
    }

    #[test]
    fn cell_round_trip() {
        assert_eq!(parse_metric_cell("2000000"), Some(2_000_000.0));
        assert_eq!(parse_metric_cell("0.034"), Some(0.034));
        assert_eq!(parse_metric_cell(MISSING_METRIC), None);
        assert_eq!(parse_metric_cell("garbage"), None);
    }

    #[test]
    fn control_column_parsing() {
        assert_eq!("cost_micros".parse::<Metric>().unwrap(), Metric::CostMicros);
        assert!("productItemId".parse::<Metric>().is_err());
    }
}
