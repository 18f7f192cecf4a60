use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value};

use crate::error::ParserError;

pub const ID_FIELD: &str = "id";
pub const EXPERIMENT_ID_FIELD: &str = "experimentId";
pub const MOLECULAR_IMAGE_FIELD: &str = "MolecularImage";

/// Decode the script's JSON artifact. Anything but an object is rejected.
pub fn decode_document(bytes: &[u8], path: &Path) -> Result<Map<String, Value>, ParserError> {
    let value: Value = serde_json::from_slice(bytes).map_err(|source| ParserError::JsonDecode {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ParserError::NotAnObject {
            path: path.to_path_buf(),
        }),
    }
}

/// The experiment identifier from request metadata, if it is usable:
/// null and blank strings count as absent.
pub fn experiment_id(metadata: Option<&Map<String, Value>>) -> Option<&Value> {
    let value = metadata?.get(EXPERIMENT_ID_FIELD)?;
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        _ => Some(value),
    }
}

/// Stamp `id` (and `experimentId` when known) onto the document.
/// Without an experiment identifier `id` is a fresh UUID v4.
pub fn assign_ids(document: &mut Map<String, Value>, metadata: Option<&Map<String, Value>>) {
    match experiment_id(metadata) {
        Some(id) => {
            document.insert(ID_FIELD.to_string(), id.clone());
            document.insert(EXPERIMENT_ID_FIELD.to_string(), id.clone());
        }
        None => {
            document.insert(
                ID_FIELD.to_string(),
                Value::String(uuid::Uuid::new_v4().to_string()),
            );
        }
    }
}

/// Inline the molecule image as base64. A missing or unreadable image is
/// logged and leaves the document untouched.
pub async fn embed_image(document: &mut Map<String, Value>, image_path: &Path) {
    match tokio::fs::read(image_path).await {
        Ok(bytes) => {
            document.insert(
                MOLECULAR_IMAGE_FIELD.to_string(),
                Value::String(STANDARD.encode(bytes)),
            );
        }
        Err(e) => {
            tracing::error!(path = %image_path.display(), "unable to read molecule image: {e}");
        }
    }
}
