//! Response shaping: serialize documents and attach reference titles

use crate::core::descriptor::ResourceDescriptor;
use crate::core::entity::Data;
use crate::core::reference::ReferenceDirectory;
use crate::core::error::StorageError;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Serializes documents for one resource and adds a `<stem>_title` field for
/// every foreign key that references another resource.
pub struct ResponseShaper<'a> {
    descriptor: &'a ResourceDescriptor,
    references: &'a ReferenceDirectory,
    placeholder: &'a str,
}

impl<'a> ResponseShaper<'a> {
    pub fn new(
        descriptor: &'a ResourceDescriptor,
        references: &'a ReferenceDirectory,
        placeholder: &'a str,
    ) -> Self {
        Self {
            descriptor,
            references,
            placeholder,
        }
    }

    /// Shape a batch of documents. Every input document appears in the output,
    /// in order, whether or not its references resolve.
    pub async fn shape<T: Data + Serialize>(&self, docs: &[T]) -> Result<Vec<Value>, StorageError> {
        let mut resolved: HashMap<&str, HashMap<Uuid, String>> = HashMap::new();
        for (fk, plural) in self.descriptor.referenced_keys() {
            let mut ids: Vec<Uuid> = docs
                .iter()
                .filter_map(|doc| doc.field_value(&fk.field).and_then(|v| v.as_uuid()))
                .collect();
            ids.sort_unstable();
            ids.dedup();
            let titles = self.references.resolve(plural, &ids).await;
            resolved.insert(fk.field.as_str(), titles);
        }

        docs.iter()
            .map(|doc| {
                let mut value = serde_json::to_value(doc).map_err(|e| StorageError::DecodeError {
                    resource: self.descriptor.plural.clone(),
                    message: e.to_string(),
                })?;
                if let Value::Object(map) = &mut value {
                    for (fk, _) in self.descriptor.referenced_keys() {
                        let title = doc
                            .field_value(&fk.field)
                            .and_then(|v| v.as_uuid())
                            .and_then(|id| resolved.get(fk.field.as_str())?.get(&id).cloned())
                            .unwrap_or_else(|| self.placeholder.to_string());
                        map.insert(fk.title_key(), Value::String(title));
                    }
                }
                Ok(value)
            })
            .collect()
    }

    /// Shape a single document
    pub async fn shape_one<T: Data + Serialize>(&self, doc: &T) -> Result<Value, StorageError> {
        let mut shaped = self.shape(std::slice::from_ref(doc)).await?;
        Ok(shaped.pop().unwrap_or(Value::Null))
    }
}
