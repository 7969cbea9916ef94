//! In-memory DAM for unit tests.

use super::{DamGateway, FieldValue, MetadataField, NewField};
use crate::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TagRecord {
    pub path: String,
    pub uuid: String,
    pub value: String,
    pub propagatable: bool,
}

/// Configurable fake that records every call.
#[derive(Default)]
pub struct MemoryDam {
    files: Mutex<HashMap<String, Vec<u8>>>,
    fields: Mutex<Vec<MetadataField>>,
    previews: Mutex<Vec<(String, Vec<u8>)>>,
    tags: Mutex<Vec<TagRecord>>,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    download_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: Option<Duration>,
    fail_fields: bool,
    fail_uploads: bool,
    fail_tags: bool,
}

impl MemoryDam {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: &str, content: &[u8]) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_vec());
        self
    }

    pub fn with_field(self, uuid: &str, name: &str) -> Self {
        self.fields.lock().unwrap().push(MetadataField {
            uuid: uuid.to_string(),
            name: name.to_string(),
        });
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn failing_fields(mut self) -> Self {
        self.fail_fields = true;
        self
    }

    pub fn failing_uploads(mut self) -> Self {
        self.fail_uploads = true;
        self
    }

    pub fn failing_tags(mut self) -> Self {
        self.fail_tags = true;
        self
    }

    pub fn clear_fields(&self) {
        self.fields.lock().unwrap().clear();
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn previews(&self) -> Vec<(String, Vec<u8>)> {
        self.previews.lock().unwrap().clone()
    }

    pub fn tags(&self) -> Vec<TagRecord> {
        self.tags.lock().unwrap().clone()
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn unavailable(operation: &'static str, path: &str) -> PipelineError {
        PipelineError::Transport {
            operation,
            path: path.to_string(),
            message: "HTTP 503 Service Unavailable".to_string(),
            status_code: Some(503),
        }
    }
}

#[async_trait]
impl DamGateway for MemoryDam {
    fn name(&self) -> &str {
        "memory"
    }

    async fn download(&self, depot_path: &str, dest: &Path) -> PipelineResult<u64> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.pause().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let content = self.files.lock().unwrap().get(depot_path).cloned();
        let Some(content) = content else {
            return Err(PipelineError::Transport {
                operation: "download",
                path: depot_path.to_string(),
                message: "HTTP 404 Not Found".to_string(),
                status_code: Some(404),
            });
        };

        tokio::fs::write(dest, &content)
            .await
            .map_err(|source| PipelineError::Io {
                path: depot_path.to_string(),
                source,
            })?;
        Ok(content.len() as u64)
    }

    async fn upload_preview(&self, depot_path: &str, png: &[u8]) -> PipelineResult<()> {
        if self.fail_uploads {
            return Err(Self::unavailable("preview upload", depot_path));
        }
        self.previews
            .lock()
            .unwrap()
            .push((depot_path.to_string(), png.to_vec()));
        Ok(())
    }

    async fn list_fields(&self) -> PipelineResult<Vec<MetadataField>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_fields {
            return Err(Self::unavailable("field listing", "fields"));
        }
        Ok(self.fields.lock().unwrap().clone())
    }

    async fn create_field(&self, field: &NewField) -> PipelineResult<String> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.pause().await;
        let uuid = format!("field-{n}");
        self.fields.lock().unwrap().push(MetadataField {
            uuid: uuid.clone(),
            name: field.name.clone(),
        });
        Ok(uuid)
    }

    async fn attach_metadata(
        &self,
        depot_paths: &[String],
        values: &[FieldValue],
        propagatable: bool,
    ) -> PipelineResult<()> {
        if self.fail_tags {
            return Err(Self::unavailable("metadata update", &depot_paths.join(", ")));
        }
        let mut tags = self.tags.lock().unwrap();
        for path in depot_paths {
            for value in values {
                tags.push(TagRecord {
                    path: path.clone(),
                    uuid: value.uuid.clone(),
                    value: value.value.clone(),
                    propagatable,
                });
            }
        }
        Ok(())
    }
}
