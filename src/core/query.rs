//! Query parameters and pagination utilities
//!
//! List endpoints receive a flat bag of optional string parameters. The
//! [`ListParams::normalize`] step turns that bag into a canonical
//! [`ListQuery`] for one resource, defaulting what can be defaulted and
//! rejecting what cannot.

use crate::core::descriptor::{NamedFilter, ResourceDescriptor};
use crate::core::error::{FieldValidationError, ValidationError};
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Default page number
pub const DEFAULT_PAGE: u64 = 1;

/// Default number of items per page
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Raw list request parameters
///
/// Every field arrives as an optional string. Resource-specific keys
/// (`branchId`, `status`, `customerType`, ...) land in `extra`.
///
/// # Example
/// ```text
/// GET /purchases?page=2&pageSize=20&query=INV-2024&branchId=...&dateRange=2024-01-01_2024-03-31
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ListParams {
    /// Page number (starts at 1)
    #[serde(default)]
    pub page: Option<String>,

    /// Number of items per page
    #[serde(default, rename = "pageSize")]
    pub page_size: Option<String>,

    /// Free-text search
    #[serde(default)]
    pub query: Option<String>,

    /// Named filter key
    #[serde(default)]
    pub filter: Option<String>,

    /// Date range, `<start>_<end>`
    #[serde(default, rename = "dateRange")]
    pub date_range: Option<String>,

    /// Resource-specific parameters
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

/// Page size bounds applied during normalization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageLimits {
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

fn default_max_page_size() -> u64 {
    100
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: default_max_page_size(),
        }
    }
}

/// Canonical, validated list query for one resource
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub page: u64,
    pub page_size: u64,

    /// Free-text search, trimmed
    pub text: Option<String>,

    /// A `filter` key known to the resource
    pub named_filter: Option<String>,

    /// Foreign-key filters, keyed by request parameter
    pub foreign_keys: IndexMap<String, Uuid>,

    /// Categorical filters, keyed by request parameter
    pub categorical: IndexMap<String, String>,

    pub date_range: Option<DateRange>,
}

impl ListQuery {
    /// Query with default pagination and no filters
    pub fn unfiltered() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            text: None,
            named_filter: None,
            foreign_keys: IndexMap::new(),
            categorical: IndexMap::new(),
            date_range: None,
        }
    }

    /// Number of matching documents to skip
    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// Whether a further page exists after this one
    pub fn is_next(&self, total_count: u64) -> bool {
        self.page.saturating_mul(self.page_size) < total_count
    }
}

impl ListParams {
    /// Build a parameter bag from key/value pairs, as a query string would
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "page" => params.page = value,
                "pageSize" => params.page_size = value,
                "query" => params.query = value,
                "filter" => params.filter = value,
                "dateRange" => params.date_range = value,
                other => {
                    params.extra.insert(other.to_string(), value.unwrap_or_default());
                }
            }
        }
        params
    }

    /// Normalize the raw parameters against a resource descriptor.
    ///
    /// Absent, empty or malformed pagination values fall back to defaults, and
    /// an unknown `filter` key is treated as not specified. Foreign-key ids
    /// that are not valid ids and categorical values outside the allowed set
    /// cannot be defaulted and are reported as field-level validation errors.
    pub fn normalize(
        &self,
        descriptor: &ResourceDescriptor,
        limits: &PageLimits,
    ) -> Result<ListQuery, ValidationError> {
        let mut errors = Vec::new();

        let page = parse_positive(self.page.as_deref()).unwrap_or(DEFAULT_PAGE);
        let page_size = parse_positive(self.page_size.as_deref())
            .unwrap_or(limits.default_page_size)
            .min(limits.max_page_size.max(1));

        let text = specified(self.query.as_deref()).map(str::to_string);

        let named_filter = match specified(self.filter.as_deref()) {
            Some(key) if descriptor.named_filters.contains_key(key) => Some(key.to_string()),
            Some(key) => {
                tracing::debug!(filter = key, "ignoring unknown filter");
                None
            }
            None => None,
        };

        let mut foreign_keys = IndexMap::new();
        for param in descriptor.foreign_keys.keys() {
            if let Some(raw) = specified(self.extra.get(param).map(String::as_str)) {
                match Uuid::parse_str(raw) {
                    Ok(id) => {
                        foreign_keys.insert(param.clone(), id);
                    }
                    Err(_) => errors.push(FieldValidationError::new(
                        param.as_str(),
                        "must be a valid id",
                    )),
                }
            }
        }

        let mut categorical = IndexMap::new();
        for (param, spec) in &descriptor.categorical {
            if let Some(raw) = specified(self.extra.get(param).map(String::as_str)) {
                if spec.allowed.is_empty() || spec.allowed.iter().any(|v| v == raw) {
                    categorical.insert(param.clone(), raw.to_string());
                } else {
                    errors.push(FieldValidationError::new(
                        param.as_str(),
                        format!("must be one of: {}", spec.allowed.join(", ")),
                    ));
                }
            }
        }

        let date_range = match specified(self.date_range.as_deref()) {
            Some(raw) if descriptor.date_field.is_some() => match raw.parse::<DateRange>() {
                Ok(range) => Some(range),
                Err(e) => {
                    tracing::debug!(date_range = raw, error = %e, "ignoring unparsable dateRange");
                    None
                }
            },
            _ => None,
        };

        if !errors.is_empty() {
            return Err(ValidationError::FieldErrors(errors));
        }

        Ok(ListQuery {
            page,
            page_size,
            text,
            named_filter,
            foreign_keys,
            categorical,
            date_range,
        })
    }
}

/// Treat empty and whitespace-only values as "not specified"
fn specified(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_positive(value: Option<&str>) -> Option<u64> {
    specified(value)
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|v| *v > 0)
        .map(|v| v as u64)
}

/// Inclusive date range, encoded as `<start>_<end>`
///
/// Each side is an RFC 3339 instant or a `YYYY-MM-DD` date. A bare start date
/// means the start of that day, a bare end date the last millisecond of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Build a range, swapping the bounds if given in reverse order
    pub fn new(a: DateTime<Utc>, b: DateTime<Utc>) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        *instant >= self.start && *instant <= self.end
    }
}

/// Reasons a `dateRange` value could not be parsed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DateRangeError {
    #[error("expected '<start>_<end>'")]
    MissingDelimiter,

    #[error("unrecognized date '{0}'")]
    InvalidDate(String),
}

impl FromStr for DateRange {
    type Err = DateRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .trim()
            .split_once('_')
            .ok_or(DateRangeError::MissingDelimiter)?;
        let start = parse_bound(start, NaiveTime::MIN)?;
        let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
        let end = parse_bound(end, end_of_day)?;
        Ok(DateRange::new(start, end))
    }
}

fn parse_bound(raw: &str, time_of_day: NaiveTime) -> Result<DateTime<Utc>, DateRangeError> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| Utc.from_utc_datetime(&date.and_time(time_of_day)))
        .map_err(|_| DateRangeError::InvalidDate(raw.to_string()))
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}",
            self.start.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            self.end.to_rfc3339_opts(SecondsFormat::AutoSi, true)
        )
    }
}

/// Whether `filter` narrows the search fields for this query
pub(crate) fn scoped_fields<'a>(
    query: &ListQuery,
    descriptor: &'a ResourceDescriptor,
) -> Option<&'a [String]> {
    let key = query.named_filter.as_ref()?;
    match descriptor.named_filters.get(key)? {
        NamedFilter::Scope { fields } => Some(fields.as_slice()),
        NamedFilter::Predicate { .. } => None,
    }
}
