//! Declarative per-resource list descriptors
//!
//! A [`ResourceDescriptor`] tells the generic pipeline everything it needs to
//! know about one listable resource: which fields the free-text query searches,
//! which request parameters are equality filters, which date field a
//! `dateRange` bounds, which numeric fields are summed, how results are sorted
//! and which roles may list it.
//!
//! Descriptors are plain data so they can be declared in code or loaded from
//! the YAML configuration.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A named `filter` value accepted by a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NamedFilter {
    /// Narrow the free-text query to these fields only
    Scope { fields: Vec<String> },

    /// Add a categorical predicate `field == value`
    Predicate { field: String, value: String },
}

/// A foreign-key request parameter (e.g. `branchId`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Document field holding the referenced id (e.g. `branch_id`)
    pub field: String,

    /// Plural name of the referenced resource, used to resolve display titles
    #[serde(default)]
    pub references: Option<String>,
}

impl ForeignKey {
    /// Key of the denormalized display field added next to the id
    ///
    /// `branch_id` becomes `branch_title`.
    pub fn title_key(&self) -> String {
        match self.field.strip_suffix("_id") {
            Some(stem) => format!("{}_title", stem),
            None => format!("{}_title", self.field),
        }
    }
}

/// A categorical request parameter (e.g. `status`, `customerType`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Categorical {
    /// Document field compared for equality
    pub field: String,

    /// Accepted values; empty means any value is accepted
    #[serde(default)]
    pub allowed: Vec<String>,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Sort order for list results. The document id is always the tiebreak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortOrder {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self {
            field: "created_at".to_string(),
            direction: SortDirection::Desc,
        }
    }
}

/// Declarative description of one listable resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Singular name (e.g. "purchase")
    pub name: String,

    /// Plural name (e.g. "purchases"), used as route segment and envelope key
    pub plural: String,

    /// Fields matched by the free-text `query`
    #[serde(default)]
    pub search_fields: Vec<String>,

    /// Accepted `filter` keys
    #[serde(default)]
    pub named_filters: IndexMap<String, NamedFilter>,

    /// Foreign-key parameters, keyed by request parameter name
    #[serde(default)]
    pub foreign_keys: IndexMap<String, ForeignKey>,

    /// Categorical parameters, keyed by request parameter name
    #[serde(default)]
    pub categorical: IndexMap<String, Categorical>,

    /// Field bounded by `dateRange`
    #[serde(default)]
    pub date_field: Option<String>,

    /// Whether list responses carry a summary row
    #[serde(default)]
    pub summary: bool,

    /// Numeric fields summed into the summary row
    #[serde(default)]
    pub sum_fields: Vec<String>,

    #[serde(default)]
    pub sort: SortOrder,

    /// Roles allowed to read this resource
    pub roles: Vec<String>,

    /// Pin `branchId` to the caller's own branch for branch-scoped roles
    #[serde(default)]
    pub branch_scoped: bool,
}

/// Request parameter that carries the branch foreign key
pub const BRANCH_PARAM: &str = "branchId";

impl ResourceDescriptor {
    /// Create a descriptor with no search, filter or summary configuration
    pub fn new(name: &str, plural: &str) -> Self {
        Self {
            name: name.to_string(),
            plural: plural.to_string(),
            search_fields: Vec::new(),
            named_filters: IndexMap::new(),
            foreign_keys: IndexMap::new(),
            categorical: IndexMap::new(),
            date_field: None,
            summary: false,
            sum_fields: Vec::new(),
            sort: SortOrder::default(),
            roles: Vec::new(),
            branch_scoped: false,
        }
    }

    pub fn search(mut self, fields: &[&str]) -> Self {
        self.search_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn scope_filter(mut self, key: &str, fields: &[&str]) -> Self {
        self.named_filters.insert(
            key.to_string(),
            NamedFilter::Scope {
                fields: fields.iter().map(|f| f.to_string()).collect(),
            },
        );
        self
    }

    pub fn predicate_filter(mut self, key: &str, field: &str, value: &str) -> Self {
        self.named_filters.insert(
            key.to_string(),
            NamedFilter::Predicate {
                field: field.to_string(),
                value: value.to_string(),
            },
        );
        self
    }

    pub fn foreign_key(mut self, param: &str, field: &str, references: Option<&str>) -> Self {
        self.foreign_keys.insert(
            param.to_string(),
            ForeignKey {
                field: field.to_string(),
                references: references.map(str::to_string),
            },
        );
        self
    }

    pub fn categorical(mut self, param: &str, field: &str, allowed: &[&str]) -> Self {
        self.categorical.insert(
            param.to_string(),
            Categorical {
                field: field.to_string(),
                allowed: allowed.iter().map(|v| v.to_string()).collect(),
            },
        );
        self
    }

    pub fn date_field(mut self, field: &str) -> Self {
        self.date_field = Some(field.to_string());
        self
    }

    /// Enable the summary row, summing the given fields
    pub fn summarize(mut self, fields: &[&str]) -> Self {
        self.summary = true;
        self.sum_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn sort_by(mut self, field: &str, direction: SortDirection) -> Self {
        self.sort = SortOrder {
            field: field.to_string(),
            direction,
        };
        self
    }

    pub fn roles(mut self, roles: &[&str]) -> Self {
        self.roles = roles.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn branch_scoped(mut self) -> Self {
        self.branch_scoped = true;
        self
    }

    /// The foreign key used for branch scoping, if this resource has one
    pub fn branch_key(&self) -> Option<&ForeignKey> {
        self.foreign_keys.get(BRANCH_PARAM)
    }

    /// Foreign keys whose display title should be resolved
    pub fn referenced_keys(&self) -> impl Iterator<Item = (&ForeignKey, &str)> {
        self.foreign_keys
            .values()
            .filter_map(|fk| fk.references.as_deref().map(|r| (fk, r)))
    }
}

/// Summary key for a summed field: `grand_total` becomes `totalGrandTotal`
pub fn summary_key(field: &str) -> String {
    let mut key = String::from("total");
    for part in field.split('_').filter(|p| !p.is_empty()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            key.extend(first.to_uppercase());
            key.push_str(chars.as_str());
        }
    }
    key
}
