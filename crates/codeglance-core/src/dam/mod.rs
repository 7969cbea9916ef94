//! DAM integration: file transfer, previews, and metadata fields.
//!
//! [`DamGateway`] is the raw remote API, one outbound call per method and no
//! retries. [`FieldRegistry`] layers the cached, create-if-missing field
//! resolution used to tag files with their language on top of it.

pub(crate) mod fields;
pub(crate) mod helix;
#[cfg(test)]
pub(crate) mod testing;

pub use fields::FieldRegistry;
pub use helix::HelixDamClient;

use crate::error::PipelineResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A custom metadata field template on the DAM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataField {
    pub uuid: String,
    pub name: String,
}

/// Body of a field creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub available_values: Vec<String>,
    pub hidden: bool,
}

impl NewField {
    /// A visible free-text field with no enumerated values.
    pub fn text(name: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type: "text".to_string(),
            available_values: Vec::new(),
            hidden: false,
        }
    }
}

/// One value to attach under a field identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValue {
    pub uuid: String,
    pub value: String,
}

/// Remote DAM operations.
///
/// Uses `async_trait` so workers can hold an `Arc<dyn DamGateway>`.
#[async_trait]
pub trait DamGateway: Send + Sync {
    /// Gateway name for logging.
    fn name(&self) -> &str;

    /// Stream the file at `depot_path` into `dest`, returning the byte count.
    async fn download(&self, depot_path: &str, dest: &Path) -> PipelineResult<u64>;

    /// Attach a PNG as the file's preview.
    async fn upload_preview(&self, depot_path: &str, png: &[u8]) -> PipelineResult<()>;

    /// List existing metadata field templates.
    async fn list_fields(&self) -> PipelineResult<Vec<MetadataField>>;

    /// Create a metadata field template, returning its identifier.
    async fn create_field(&self, field: &NewField) -> PipelineResult<String>;

    /// Attach field values to one or more files.
    async fn attach_metadata(
        &self,
        depot_paths: &[String],
        values: &[FieldValue],
        propagatable: bool,
    ) -> PipelineResult<()>;
}
