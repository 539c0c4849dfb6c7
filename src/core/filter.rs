//! Filter expressions compiled from list queries
//!
//! [`compile`] turns a canonical [`ListQuery`] plus its resource's
//! [`ResourceDescriptor`] into a [`Filter`]. The same filter value is handed to
//! the paginated fetch, the count and the summary of a request, so all three
//! see the same matching set.
//!
//! In-memory evaluation goes through [`Filter::matcher`], which compiles the
//! free-text needles once per request.

use crate::core::descriptor::{NamedFilter, ResourceDescriptor};
use crate::core::entity::Data;
use crate::core::field::FieldValue;
use crate::core::query::{ListQuery, scoped_fields};
use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};

/// A predicate over documents of one collection
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document
    All,

    /// Every inner filter must match
    And(Vec<Filter>),

    /// At least one inner filter must match
    Or(Vec<Filter>),

    /// Exact match on a field
    Eq { field: String, value: FieldValue },

    /// Case-insensitive substring match on a field
    Contains { field: String, needle: String },

    /// Inclusive timestamp bounds on a field
    Between {
        field: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl Filter {
    /// Combine predicates conjunctively, collapsing trivial cases
    pub fn all_of(mut predicates: Vec<Filter>) -> Filter {
        predicates.retain(|p| *p != Filter::All);
        match predicates.len() {
            0 => Filter::All,
            1 => predicates.remove(0),
            _ => Filter::And(predicates),
        }
    }

    /// Combine predicates disjunctively
    pub fn any_of(mut predicates: Vec<Filter>) -> Filter {
        match predicates.len() {
            1 => predicates.remove(0),
            _ => Filter::Or(predicates),
        }
    }

    /// Whether this filter matches every document
    pub fn is_all(&self) -> bool {
        matches!(self, Filter::All)
    }

    /// Compile to an in-memory matcher
    pub fn matcher(&self) -> Result<Matcher, regex::Error> {
        Ok(match self {
            Filter::All => Matcher::All,
            Filter::And(inner) => Matcher::And(
                inner
                    .iter()
                    .map(Filter::matcher)
                    .collect::<Result<_, _>>()?,
            ),
            Filter::Or(inner) => Matcher::Or(
                inner
                    .iter()
                    .map(Filter::matcher)
                    .collect::<Result<_, _>>()?,
            ),
            Filter::Eq { field, value } => Matcher::Eq {
                field: field.clone(),
                value: value.to_text(),
            },
            Filter::Contains { field, needle } => Matcher::Contains {
                field: field.clone(),
                pattern: substring_pattern(needle)?,
            },
            Filter::Between { field, start, end } => Matcher::Between {
                field: field.clone(),
                start: *start,
                end: *end,
            },
        })
    }
}

/// Literal, case-insensitive pattern for a search needle
pub fn substring_pattern(needle: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
}

/// A [`Filter`] with its needles compiled, ready to test documents
#[derive(Debug, Clone)]
pub enum Matcher {
    All,
    And(Vec<Matcher>),
    Or(Vec<Matcher>),
    Eq {
        field: String,
        value: Option<String>,
    },
    Contains {
        field: String,
        pattern: Regex,
    },
    Between {
        field: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl Matcher {
    pub fn matches<T: Data>(&self, doc: &T) -> bool {
        match self {
            Matcher::All => true,
            Matcher::And(inner) => inner.iter().all(|m| m.matches(doc)),
            Matcher::Or(inner) => inner.iter().any(|m| m.matches(doc)),
            Matcher::Eq { field, value } => {
                let actual = doc.field_value(field).and_then(|v| v.to_text());
                value.is_some() && actual == *value
            }
            Matcher::Contains { field, pattern } => doc
                .field_value(field)
                .and_then(|v| v.to_text())
                .is_some_and(|text| pattern.is_match(&text)),
            Matcher::Between { field, start, end } => doc
                .field_value(field)
                .and_then(|v| v.as_datetime())
                .is_some_and(|at| at >= *start && at <= *end),
        }
    }
}

/// Compile a canonical query into a filter for the described resource.
///
/// - free text becomes an OR of substring matches over the search fields,
///   narrowed by a scope-style `filter`
/// - a predicate-style `filter` adds `field == value`
/// - foreign keys and categoricals become exact matches, only when present
/// - `dateRange` bounds the descriptor's date field inclusively
///
/// Distinct dimensions are always ANDed. With nothing specified the result is
/// [`Filter::All`].
pub fn compile(query: &ListQuery, descriptor: &ResourceDescriptor) -> Filter {
    let mut predicates = Vec::new();

    if let Some(text) = &query.text {
        let fields = scoped_fields(query, descriptor).unwrap_or(&descriptor.search_fields);
        if fields.is_empty() {
            tracing::debug!(resource = %descriptor.plural, "resource has no search fields, ignoring query");
        } else {
            predicates.push(Filter::any_of(
                fields
                    .iter()
                    .map(|field| Filter::Contains {
                        field: field.clone(),
                        needle: text.clone(),
                    })
                    .collect(),
            ));
        }
    }

    if let Some(key) = &query.named_filter
        && let Some(NamedFilter::Predicate { field, value }) = descriptor.named_filters.get(key)
    {
        predicates.push(Filter::Eq {
            field: field.clone(),
            value: FieldValue::String(value.clone()),
        });
    }

    for (param, id) in &query.foreign_keys {
        if let Some(fk) = descriptor.foreign_keys.get(param) {
            predicates.push(Filter::Eq {
                field: fk.field.clone(),
                value: FieldValue::Uuid(*id),
            });
        }
    }

    for (param, value) in &query.categorical {
        if let Some(spec) = descriptor.categorical.get(param) {
            predicates.push(Filter::Eq {
                field: spec.field.clone(),
                value: FieldValue::String(value.clone()),
            });
        }
    }

    if let (Some(range), Some(field)) = (&query.date_range, &descriptor.date_field) {
        predicates.push(Filter::Between {
            field: field.clone(),
            start: range.start,
            end: range.end,
        });
    }

    Filter::all_of(predicates)
}
