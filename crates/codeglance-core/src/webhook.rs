//! DAM change-notification parsing.
//!
//! A notification body is a JSON array of updates; each update may list
//! `objects.files.added` and `objects.files.modified` depot paths. Paths with
//! a known grammar are enqueued, everything else is dropped here so unsupported
//! files never reach the pipeline.

use serde_json::Value;

use crate::error::IngestError;
use crate::pipeline::lexer::LexerResolver;
use crate::pipeline::queue::{WorkItem, WorkQueue};

const ACTIONS: [&str; 2] = ["added", "modified"];

/// Outcome of scanning one notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Supported depot paths, in notification order
    pub accepted: Vec<String>,
    /// Paths dropped because no grammar matches
    pub unsupported: usize,
    /// Updates without added/modified files
    pub skipped_updates: usize,
}

/// Parse a request body into a list of updates.
///
/// An empty body, invalid JSON, or an empty JSON value is rejected. A single
/// update object is treated as a batch of one.
pub fn parse_updates(body: &[u8]) -> Result<Vec<Value>, IngestError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        tracing::error!("No JSON data in request");
        return Err(IngestError::NoJsonData);
    }

    let value: Value = serde_json::from_slice(body).map_err(|e| {
        tracing::error!("No JSON data in request: {e}");
        IngestError::NoJsonData
    })?;

    match value {
        Value::Array(updates) if !updates.is_empty() => Ok(updates),
        Value::Object(map) if !map.is_empty() => Ok(vec![Value::Object(map)]),
        other => {
            tracing::error!("No JSON data in request: unusable body {other}");
            Err(IngestError::NoJsonData)
        }
    }
}

/// Collect the supported added/modified paths from a batch of updates.
pub fn scan_updates(updates: &[Value], resolver: &LexerResolver) -> ScanResult {
    let mut result = ScanResult::default();

    for update in updates {
        let files = update
            .get("objects")
            .and_then(|objects| objects.get("files"))
            .filter(|files| ACTIONS.iter().any(|action| files.get(action).is_some()));

        let Some(files) = files else {
            tracing::warn!("Skipping update: No added or modified 'objects' or 'files' in update");
            tracing::debug!("{update}");
            result.skipped_updates += 1;
            continue;
        };

        for action in ACTIONS {
            let Some(entries) = files.get(action).and_then(Value::as_array) else {
                continue;
            };
            for entry in entries {
                let Some(depot_path) = entry.as_str() else {
                    tracing::warn!("Skipping non-string {action} entry: {entry}");
                    continue;
                };
                if resolver.is_supported(depot_path) {
                    result.accepted.push(depot_path.to_string());
                } else {
                    tracing::debug!("Skipping file {depot_path}: No lexer found");
                    result.unsupported += 1;
                }
            }
        }
    }

    result
}

/// Parse, filter and enqueue a notification. Returns how many files were queued.
pub fn ingest(body: &[u8], resolver: &LexerResolver, queue: &WorkQueue) -> Result<usize, IngestError> {
    let updates = parse_updates(body)?;
    let scan = scan_updates(&updates, resolver);

    let queued = scan
        .accepted
        .into_iter()
        .filter(|path| queue.enqueue(WorkItem::new(path.as_str())))
        .count();

    tracing::info!(
        "Queued {queued} files for processing ({} unsupported, {} updates skipped)",
        scan.unsupported,
        scan.skipped_updates
    );
    Ok(queued)
}

/// Response message for a successful notification.
pub fn queued_message(count: usize) -> String {
    format!("Queued {count} files for processing")
}
