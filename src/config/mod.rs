//! Configuration loading and management
//!
//! A [`TallyConfig`] is read from YAML. Every key is optional: the defaults
//! describe the built-in ERP catalog served on `127.0.0.1:3000`. Entries under
//! `resources` replace the built-in descriptor of the same `name` or add a new
//! resource.
//!
//! ```yaml
//! server:
//!   bind: 0.0.0.0:8080
//! pagination:
//!   default_page_size: 20
//!   max_page_size: 200
//! placeholder_title: "-"
//! resources:
//!   - name: expense
//!     plural: expenses
//!     roles: [admin]
//!     search_fields: [title]
//! ```

use crate::core::descriptor::{ResourceDescriptor, SortDirection};
use crate::core::error::ConfigError;
use crate::core::pipeline::PipelineSettings;
use crate::core::query::PageLimits;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Complete configuration for a tally server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TallyConfig {
    pub server: ServerConfig,

    pub pagination: PageLimits,

    /// Title shown for references that cannot be resolved
    pub placeholder_title: String,

    /// Roles pinned to their own branch on branch-scoped resources
    pub branch_scoped_roles: Vec<String>,

    /// Start from the built-in ERP catalog before applying `resources`
    pub builtin_resources: bool,

    pub resources: Vec<ResourceDescriptor>,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            pagination: PageLimits::default(),
            placeholder_title: "N/A".to_string(),
            branch_scoped_roles: vec!["branch".to_string()],
            builtin_resources: true,
            resources: Vec::new(),
        }
    }
}

impl TallyConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&content).map_err(|e| match e {
            ConfigError::ParseError { message, .. } => ConfigError::ParseError {
                file: Some(path.display().to_string()),
                message,
            },
            other => other,
        })
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Self::parse(yaml)
    }

    fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        let overrides = std::mem::take(&mut config.resources);
        if config.builtin_resources {
            config.resources = erp_catalog();
        }
        config.merge_resources(overrides);
        config.validate()?;
        Ok(config)
    }

    /// The built-in ERP catalog with default server settings
    pub fn default_config() -> Self {
        Self {
            resources: erp_catalog(),
            ..Self::default()
        }
    }

    /// Replace descriptors by `name`, appending unknown ones
    pub fn merge_resources(&mut self, overrides: Vec<ResourceDescriptor>) {
        for descriptor in overrides {
            match self.resources.iter_mut().find(|r| r.name == descriptor.name) {
                Some(existing) => *existing = descriptor,
                None => self.resources.push(descriptor),
            }
        }
    }

    /// Check the configuration for values the pipeline cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pagination.default_page_size == 0 {
            return Err(invalid("pagination.default_page_size", "0", "must be positive"));
        }
        if self.pagination.max_page_size == 0 {
            return Err(invalid("pagination.max_page_size", "0", "must be positive"));
        }
        if self.pagination.default_page_size > self.pagination.max_page_size {
            return Err(invalid(
                "pagination.default_page_size",
                &self.pagination.default_page_size.to_string(),
                "must not exceed max_page_size",
            ));
        }
        if self.server.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(invalid("server.bind", &self.server.bind, "must be a socket address"));
        }

        let mut plurals = HashSet::new();
        for resource in &self.resources {
            let field = format!("resources.{}", resource.name);
            if !plurals.insert(resource.plural.as_str()) {
                return Err(invalid(&field, &resource.plural, "duplicate plural name"));
            }
            if resource.roles.is_empty() {
                return Err(invalid(&format!("{}.roles", field), "[]", "allow-list must not be empty"));
            }
            if resource.branch_scoped && resource.branch_key().is_none() {
                return Err(invalid(
                    &format!("{}.branch_scoped", field),
                    "true",
                    "requires a branchId foreign key",
                ));
            }
            if resource.sum_fields.is_empty() && resource.summary {
                tracing::debug!(resource = %resource.plural, "summary enabled with no summed fields");
            }
        }
        Ok(())
    }

    /// Look up a resource descriptor by plural name
    pub fn resource(&self, plural: &str) -> Option<&ResourceDescriptor> {
        self.resources.iter().find(|r| r.plural == plural)
    }

    /// Settings handed to every list pipeline
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            limits: self.pagination,
            placeholder_title: self.placeholder_title.clone(),
            branch_scoped_roles: self.branch_scoped_roles.clone(),
        }
    }
}

fn invalid(field: &str, value: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    }
}

/// Descriptors for the ERP resources shipped with the crate
pub fn erp_catalog() -> Vec<ResourceDescriptor> {
    vec![
        ResourceDescriptor::new("branch", "branches")
            .search(&["name", "address", "phone"])
            .scope_filter("name", &["name"])
            .categorical("status", "status", &["active", "inactive"])
            .sort_by("name", SortDirection::Asc)
            .roles(&["admin"]),
        ResourceDescriptor::new("category", "categories")
            .search(&["name", "description"])
            .categorical("status", "status", &["active", "inactive"])
            .sort_by("name", SortDirection::Asc)
            .roles(&["admin", "branch", "staff"]),
        ResourceDescriptor::new("customer", "customers")
            .search(&["name", "phone", "email"])
            .scope_filter("name", &["name"])
            .scope_filter("phone", &["phone"])
            .predicate_filter("owing", "status", "owing")
            .foreign_key("branchId", "branch_id", Some("branches"))
            .categorical("customerType", "customer_type", &["retail", "wholesale"])
            .categorical("status", "status", &["active", "inactive", "owing"])
            .summarize(&["due"])
            .roles(&["admin", "branch", "staff"])
            .branch_scoped(),
        ResourceDescriptor::new("supplier", "suppliers")
            .search(&["name", "company", "phone", "email"])
            .scope_filter("name", &["name"])
            .scope_filter("company", &["company"])
            .categorical("status", "status", &["active", "inactive"])
            .summarize(&["due"])
            .roles(&["admin", "branch"]),
        ResourceDescriptor::new("product", "products")
            .search(&["name", "sku"])
            .scope_filter("name", &["name"])
            .scope_filter("sku", &["sku"])
            .foreign_key("categoryId", "category_id", Some("categories"))
            .foreign_key("branchId", "branch_id", Some("branches"))
            .categorical("status", "status", &["active", "inactive"])
            .roles(&["admin", "branch", "staff"])
            .branch_scoped(),
        ResourceDescriptor::new("sale", "sales")
            .search(&["reference", "customer_name"])
            .scope_filter("reference", &["reference"])
            .scope_filter("customer", &["customer_name"])
            .predicate_filter("due", "payment_status", "due")
            .predicate_filter("partial", "payment_status", "partial")
            .predicate_filter("paid", "payment_status", "paid")
            .foreign_key("branchId", "branch_id", Some("branches"))
            .foreign_key("customerId", "customer_id", Some("customers"))
            .foreign_key("staffId", "staff_id", Some("users"))
            .categorical("status", "status", &["pending", "completed", "cancelled", "returned"])
            .categorical("paymentStatus", "payment_status", &["paid", "partial", "due"])
            .date_field("sale_date")
            .summarize(&["grand_total", "paid", "due"])
            .roles(&["admin", "branch", "staff"])
            .branch_scoped(),
        ResourceDescriptor::new("purchase", "purchases")
            .search(&["reference", "supplier_name"])
            .scope_filter("reference", &["reference"])
            .scope_filter("supplier", &["supplier_name"])
            .predicate_filter("due", "payment_status", "due")
            .predicate_filter("partial", "payment_status", "partial")
            .predicate_filter("paid", "payment_status", "paid")
            .foreign_key("branchId", "branch_id", Some("branches"))
            .foreign_key("supplierId", "supplier_id", Some("suppliers"))
            .categorical("status", "status", &["pending", "ordered", "received", "cancelled"])
            .categorical("paymentStatus", "payment_status", &["paid", "partial", "due"])
            .date_field("purchase_date")
            .summarize(&["grand_total", "paid", "due"])
            .roles(&["admin", "branch"])
            .branch_scoped(),
        ResourceDescriptor::new("expense", "expenses")
            .search(&["title", "note"])
            .scope_filter("title", &["title"])
            .foreign_key("categoryId", "category_id", Some("categories"))
            .foreign_key("branchId", "branch_id", Some("branches"))
            .categorical("status", "status", &["pending", "approved", "rejected"])
            .date_field("expense_date")
            .summarize(&["amount"])
            .roles(&["admin", "branch"])
            .branch_scoped(),
        ResourceDescriptor::new("user", "users")
            .search(&["name", "email"])
            .foreign_key("branchId", "branch_id", Some("branches"))
            .categorical("role", "role", &["admin", "branch", "staff"])
            .categorical("status", "status", &["active", "inactive"])
            .roles(&["admin"]),
    ]
}
