//! Summary rows computed over a full filtered set

use crate::core::descriptor::summary_key;
use crate::core::entity::Data;
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Aggregate over every document matching a filter, independent of pagination
///
/// Serialized flat: `{"count": 3, "totalGrandTotal": 120.5}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub count: u64,

    /// Sum per configured field, in configuration order
    pub totals: IndexMap<String, f64>,
}

impl Summary {
    /// A zero summary with every configured total present
    pub fn empty(sum_fields: &[String]) -> Self {
        Self {
            count: 0,
            totals: sum_fields.iter().map(|f| (f.clone(), 0.0)).collect(),
        }
    }

    /// Add one document. Missing or non-numeric values contribute zero.
    pub fn accumulate<T: Data>(&mut self, doc: &T) {
        self.count += 1;
        for (field, total) in self.totals.iter_mut() {
            if let Some(value) = doc.field_value(field).and_then(|v| v.as_f64()) {
                *total += value;
            }
        }
    }

    /// Build a summary from already matched documents
    pub fn over<'a, T: Data>(docs: impl IntoIterator<Item = &'a T>, sum_fields: &[String]) -> Self {
        let mut summary = Self::empty(sum_fields);
        for doc in docs {
            summary.accumulate(doc);
        }
        summary
    }

    pub fn total(&self, field: &str) -> f64 {
        self.totals.get(field).copied().unwrap_or(0.0)
    }
}

impl Serialize for Summary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.totals.len() + 1))?;
        map.serialize_entry("count", &self.count)?;
        for (field, total) in &self.totals {
            map.serialize_entry(&summary_key(field), total)?;
        }
        map.end()
    }
}
