//! HTTP client for the Helix DAM REST API.

use super::{DamGateway, FieldValue, MetadataField, NewField};
use crate::config::DamCredentials;
use crate::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DOWNLOAD_PATH: &str = "/api/p4/files/download";
const PREVIEW_PATH: &str = "/api/p4/files/preview";
const FILE_METADATA_PATH: &str = "/api/p4/files/metadata";
const FIELDS_PATH: &str = "/api/company/metadata/fields";

/// Helix DAM client authenticated with an account key.
pub struct HelixDamClient {
    base_url: String,
    account_key: String,
    client: reqwest::Client,
}

impl HelixDamClient {
    pub fn new(credentials: &DamCredentials, timeout: Duration) -> PipelineResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| transport("client setup", &credentials.url, e))?;

        Ok(Self {
            base_url: credentials.url.trim_end_matches('/').to_string(),
            account_key: credentials.account_key.clone(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

// --- Request types ---

#[derive(Serialize)]
struct PreviewUpload {
    content: String,
    encoding: &'static str,
}

#[derive(Serialize)]
struct MetadataUpdate<'a> {
    paths: &'a [String],
    metadata: &'a [FieldValue],
    propagatable: bool,
}

// --- Response types ---

/// Field listings arrive either bare or wrapped in `results`.
#[derive(Deserialize)]
#[serde(untagged)]
enum FieldList {
    Bare(Vec<MetadataField>),
    Wrapped { results: Vec<MetadataField> },
}

#[derive(Deserialize)]
struct CreatedField {
    uuid: String,
}

fn transport(operation: &'static str, path: &str, e: reqwest::Error) -> PipelineError {
    PipelineError::Transport {
        operation,
        path: path.to_string(),
        message: e.to_string(),
        status_code: e.status().map(|s| s.as_u16()),
    }
}

/// Turn a non-2xx response into a transport error carrying the body text.
async fn check_status(
    resp: reqwest::Response,
    operation: &'static str,
    path: &str,
) -> PipelineResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    Err(PipelineError::Transport {
        operation,
        path: path.to_string(),
        message: format!("HTTP {status}: {text}"),
        status_code: Some(status.as_u16()),
    })
}

#[async_trait]
impl DamGateway for HelixDamClient {
    fn name(&self) -> &str {
        "helix-dam"
    }

    async fn download(&self, depot_path: &str, dest: &Path) -> PipelineResult<u64> {
        use futures_util::StreamExt;
        use tokio::io::AsyncWriteExt;

        let resp = self
            .client
            .get(self.url(DOWNLOAD_PATH))
            .query(&[("path", depot_path)])
            .bearer_auth(&self.account_key)
            .send()
            .await
            .map_err(|e| transport("download", depot_path, e))?;
        let resp = check_status(resp, "download", depot_path).await?;

        let io_err = |source| PipelineError::Io {
            path: depot_path.to_string(),
            source,
        };

        let mut file = tokio::fs::File::create(dest).await.map_err(io_err)?;
        let mut stream = resp.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| transport("download", depot_path, e))?;
            file.write_all(&chunk).await.map_err(io_err)?;
            downloaded += chunk.len() as u64;
        }

        file.flush().await.map_err(io_err)?;
        tracing::debug!("Downloaded {depot_path} ({downloaded} bytes)");
        Ok(downloaded)
    }

    async fn upload_preview(&self, depot_path: &str, png: &[u8]) -> PipelineResult<()> {
        let body = PreviewUpload {
            content: BASE64.encode(png),
            encoding: "base64",
        };

        let resp = self
            .client
            .put(self.url(PREVIEW_PATH))
            .query(&[("path", depot_path)])
            .bearer_auth(&self.account_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport("preview upload", depot_path, e))?;
        check_status(resp, "preview upload", depot_path).await?;
        Ok(())
    }

    async fn list_fields(&self) -> PipelineResult<Vec<MetadataField>> {
        let resp = self
            .client
            .get(self.url(FIELDS_PATH))
            .bearer_auth(&self.account_key)
            .send()
            .await
            .map_err(|e| transport("field listing", FIELDS_PATH, e))?;
        let resp = check_status(resp, "field listing", FIELDS_PATH).await?;

        let fields: FieldList = resp
            .json()
            .await
            .map_err(|e| transport("field listing", FIELDS_PATH, e))?;
        Ok(match fields {
            FieldList::Bare(fields) | FieldList::Wrapped { results: fields } => fields,
        })
    }

    async fn create_field(&self, field: &NewField) -> PipelineResult<String> {
        let resp = self
            .client
            .post(self.url(FIELDS_PATH))
            .bearer_auth(&self.account_key)
            .json(field)
            .send()
            .await
            .map_err(|e| transport("field creation", FIELDS_PATH, e))?;
        let resp = check_status(resp, "field creation", FIELDS_PATH).await?;

        let created: CreatedField = resp
            .json()
            .await
            .map_err(|e| transport("field creation", FIELDS_PATH, e))?;
        Ok(created.uuid)
    }

    async fn attach_metadata(
        &self,
        depot_paths: &[String],
        values: &[FieldValue],
        propagatable: bool,
    ) -> PipelineResult<()> {
        let label = depot_paths.join(", ");
        let body = MetadataUpdate {
            paths: depot_paths,
            metadata: values,
            propagatable,
        };

        let resp = self
            .client
            .put(self.url(FILE_METADATA_PATH))
            .bearer_auth(&self.account_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport("metadata update", &label, e))?;
        check_status(resp, "metadata update", &label).await?;
        Ok(())
    }
}
