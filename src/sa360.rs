use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

use crate::error::{Error, Result};
use crate::http::{ApiClient, Page};
use crate::metrics::{MetricSet, ReportRow};
use crate::query::ReportQuery;

pub const DEFAULT_API_URL: &str = "https://searchads360.googleapis.com";
const SEARCH_RESOURCE: &str = "searchAds360:search";
const LOGIN_CUSTOMER_HEADER: &str = "login-customer-id";

/// A validated customer id: separators stripped, digits only. Construction
/// is the validation boundary, so an empty or malformed id never reaches the
/// extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerId(String);

impl CustomerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CustomerId {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let normalized: String = raw.chars().filter(|c| *c != '-').collect();
        if normalized.is_empty() {
            return Err(Error::config(format!(
                "the selected customer id ({raw:?}) is not valid"
            )));
        }
        if !normalized.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::config(format!(
                "customer id {raw:?} must contain only digits"
            )));
        }
        Ok(CustomerId(normalized))
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Absent (as opposed to empty) when the query failed remotely.
    #[serde(default)]
    results: Option<Vec<SearchResult>>,
    #[serde(default)]
    next_page_token: Option<String>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResult {
    #[serde(default)]
    segments: Segments,
    #[serde(default)]
    metrics: MetricSet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Segments {
    #[serde(default)]
    product_item_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl Page for SearchResponse {
    fn next_page_token(&self) -> Option<&str> {
        self.next_page_token.as_deref()
    }
}

/// Fetch the shopping report for one customer: build the query, drain every
/// page of the search resource, and flatten the results into report rows.
///
/// Only the first page's error slot is consulted when the results array is
/// absent; later pages share the same query and customer.
pub async fn extract(
    client: &ApiClient,
    customer_id: &CustomerId,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<Vec<ReportRow>> {
    let query = ReportQuery::new(start_date, end_date).build()?;
    let path = format!("/v0/customers/{customer_id}/{SEARCH_RESOURCE}");
    let body = json!({ "query": query });

    let mut headers = HeaderMap::new();
    let login_customer = HeaderValue::from_str(customer_id.as_str())
        .map_err(|_| Error::config(format!("customer id {customer_id} is not a valid header value")))?;
    headers.insert(LOGIN_CUSTOMER_HEADER, login_customer);

    let pages: Vec<SearchResponse> = client
        .execute(&path, Some(&body), Method::POST, headers, true)
        .await?;

    let first = pages
        .first()
        .ok_or_else(|| Error::Api("the search returned no response pages".to_string()))?;
    if first.results.is_none() {
        let detail = first
            .error
            .as_ref()
            .and_then(|e| e.message.clone())
            .unwrap_or_else(|| "the search response carried no results".to_string());
        return Err(Error::Api(detail));
    }

    let mut rows = Vec::new();
    for page in pages {
        for result in page.results.unwrap_or_default() {
            let product_item_id = result.segments.product_item_id.ok_or_else(|| {
                Error::Api("a result row is missing segments.productItemId".to_string())
            })?;
            rows.push(ReportRow {
                product_item_id,
                metrics: result.metrics,
            });
        }
    }
    Ok(rows)
}
