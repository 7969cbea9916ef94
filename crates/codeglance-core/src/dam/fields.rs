//! Cached metadata field provisioning and language tagging.
//!
//! A field name is resolved to its remote identifier once per process: look it
//! up among the existing fields, create it if absent, remember the result.
//! The cache is never invalidated, so a field renamed or deleted on the DAM
//! stays stale until restart.

use super::{DamGateway, FieldValue, NewField};
use crate::error::{PipelineError, PipelineResult};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Process-wide field name -> identifier cache.
///
/// The lock is held across the remote lookup/create so concurrent workers
/// resolving the same name produce at most one create call.
#[derive(Default)]
pub struct FieldRegistry {
    resolved: Mutex<HashMap<String, String>>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `name` to a field identifier, creating the field if needed.
    pub async fn resolve(&self, gateway: &dyn DamGateway, name: &str) -> PipelineResult<String> {
        let mut resolved = self.resolved.lock().await;
        if let Some(uuid) = resolved.get(name) {
            return Ok(uuid.clone());
        }

        let provision_err = |e: PipelineError| PipelineError::MetadataProvision {
            field: name.to_string(),
            message: e.to_string(),
        };

        let existing = gateway.list_fields().await.map_err(provision_err)?;
        let uuid = match existing.into_iter().find(|field| field.name == name) {
            Some(field) => {
                tracing::debug!("Found metadata field '{name}' ({})", field.uuid);
                field.uuid
            }
            None => {
                let uuid = gateway
                    .create_field(&NewField::text(name))
                    .await
                    .map_err(provision_err)?;
                tracing::info!("Created metadata field '{name}' ({uuid})");
                uuid
            }
        };

        resolved.insert(name.to_string(), uuid.clone());
        Ok(uuid)
    }

    /// Set `field_name` = `value` on one file, without propagation.
    pub async fn tag(
        &self,
        gateway: &dyn DamGateway,
        depot_path: &str,
        field_name: &str,
        value: &str,
    ) -> PipelineResult<()> {
        let uuid = self.resolve(gateway, field_name).await?;
        gateway
            .attach_metadata(
                &[depot_path.to_string()],
                &[FieldValue {
                    uuid,
                    value: value.to_string(),
                }],
                false,
            )
            .await
    }

    /// Cached identifier for `name`, if resolved.
    pub async fn cached(&self, name: &str) -> Option<String> {
        self.resolved.lock().await.get(name).cloned()
    }
}
