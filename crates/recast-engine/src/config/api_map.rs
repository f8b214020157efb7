//! API-map documents: endpoint to wire-schema bindings.
//!
//! The API map is a directory of JSON files, one binding per file. Bindings
//! keep their source file name so the external editor can write each file
//! back unchanged. A file that fails to parse is skipped with a logged error
//! and loading continues.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::schema::SchemaRef;

/// One path/method entry of a binding.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiRule {
    #[serde(default = "default_match_any")]
    pub path: String,
    #[serde(default = "default_match_any")]
    pub method: String,
    #[serde(flatten)]
    pub schema: SchemaRef,
    /// Error envelopes for this entry; inherits the binding's list when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<SchemaRef>>,
}

/// One API-map file: a server-pattern set plus its path/method rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiBinding {
    #[serde(default)]
    pub server: Vec<String>,
    #[serde(default)]
    pub rules: Vec<ApiRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<SchemaRef>,
}

/// Binding together with its originating file name.
#[derive(Debug, Clone)]
pub struct ApiBindingFile {
    pub binding: ApiBinding,
    pub file_name: String,
}

fn default_match_any() -> String {
    ".*".to_owned()
}

/// Load every binding file under `dir`, in file-name order.
pub fn load_api_map(dir: &Path) -> std::io::Result<Vec<ApiBindingFile>> {
    let mut entries: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .collect();
    entries.sort_by_key(|entry| entry.file_name());

    let mut bindings = Vec::new();
    for entry in entries {
        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) => {
                error!("skipping unreadable API rules file {}: {err}", path.display());
                continue;
            }
        };
        match serde_json::from_str::<ApiBinding>(&contents) {
            Ok(binding) => {
                debug!(
                    "loaded API rules file {file_name} ({} rules)",
                    binding.rules.len()
                );
                bindings.push(ApiBindingFile { binding, file_name });
            }
            Err(err) => {
                error!("skipping invalid API rules file {}: {err}", path.display());
            }
        }
    }
    Ok(bindings)
}
