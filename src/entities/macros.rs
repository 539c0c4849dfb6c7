//! Macros for reducing boilerplate when defining listable documents
//!
//! These macros generate the struct and the repetitive trait implementations
//! needed for each document type of the Entity/Data architecture.

/// Macro to create a listable document with automatic trait implementations
///
/// Every generated struct carries `id`, `created_at`, `updated_at` and
/// `status` followed by the declared fields. All of them are reachable through
/// `Data::field_value` under their Rust names, which is what filters, sorts and
/// sums refer to.
///
/// # Example
///
/// ```rust,ignore
/// use tally::prelude::*;
///
/// impl_listable_entity!(
///     Branch,
///     "branch",
///     "branches",
///     title: name,
///     {
///         name: String,
///         address: String,
///     }
/// );
///
/// let branch = Branch::new("active".to_string(), "Main".to_string(), "1 High St".to_string());
/// assert_eq!(branch.display_title(), "Main");
/// ```
#[macro_export]
macro_rules! impl_listable_entity {
    (
        $type:ident,
        $singular:expr,
        $plural:expr,
        title: $title_field:ident,
        {
            $( $specific_field:ident : $specific_type:ty ),* $(,)?
        }
    ) => {
        #[derive(Debug, Clone, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        pub struct $type {
            /// Unique identifier for this document
            pub id: ::uuid::Uuid,

            /// When this document was created
            pub created_at: ::chrono::DateTime<::chrono::Utc>,

            /// When this document was last updated
            pub updated_at: ::chrono::DateTime<::chrono::Utc>,

            /// Current status of the document
            pub status: String,
            $( pub $specific_field : $specific_type ),*
        }

        impl $crate::core::entity::Entity for $type {
            fn resource_name() -> &'static str {
                $plural
            }

            fn resource_name_singular() -> &'static str {
                $singular
            }

            fn id(&self) -> ::uuid::Uuid {
                self.id
            }

            fn created_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.created_at
            }

            fn updated_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.updated_at
            }

            fn status(&self) -> &str {
                &self.status
            }
        }

        impl $crate::core::entity::Data for $type {
            fn display_title(&self) -> String {
                ::std::string::ToString::to_string(&self.$title_field)
            }

            fn field_value(&self, field: &str) -> Option<$crate::core::field::FieldValue> {
                use $crate::core::field::IntoFieldValue;
                match field {
                    "id" => return Some(self.id.to_field_value()),
                    "created_at" => return Some(self.created_at.to_field_value()),
                    "updated_at" => return Some(self.updated_at.to_field_value()),
                    "status" => return Some(self.status.to_field_value()),
                    _ => {}
                }
                $(
                    if field == stringify!($specific_field) {
                        return Some(self.$specific_field.to_field_value());
                    }
                )*
                None
            }
        }

        // Utility methods
        impl $type {
            /// Create a new document with a fresh id and timestamps
            #[allow(clippy::too_many_arguments)]
            pub fn new(
                status: String,
                $( $specific_field: $specific_type ),*
            ) -> Self {
                let now = ::chrono::Utc::now();
                Self {
                    id: ::uuid::Uuid::new_v4(),
                    created_at: now,
                    updated_at: now,
                    status,
                    $( $specific_field ),*
                }
            }

            /// Backdate the creation timestamp (imports, seeding)
            pub fn with_created_at(mut self, at: ::chrono::DateTime<::chrono::Utc>) -> Self {
                self.created_at = at;
                self.updated_at = at;
                self
            }

            /// Update the updated_at timestamp to now
            pub fn touch(&mut self) {
                self.updated_at = ::chrono::Utc::now();
            }

            /// Change the document status
            pub fn set_status(&mut self, status: String) {
                self.status = status;
                self.touch();
            }
        }
    };
}
