//! Rule document model.
//!
//! The rule document is a JSON array of rule objects, shared with the
//! external configuration editor, which always writes the whole document
//! back. Within one engine instance the rule list is immutable.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One entry of the ordered rule list.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Rule {
    /// Disabled rules stay in the document but never match.
    #[serde(default = "default_true")]
    pub is_on: bool,

    /// Regex matched against a prefix of the destination host.
    #[serde(default = "default_match_any")]
    pub authority_expr: String,

    /// Regex matched against the full request path, leading slashes ignored.
    #[serde(default = "default_match_any")]
    pub path_expr: String,

    /// Methods the rule applies to.
    #[serde(default = "default_methods")]
    pub method: Vec<String>,

    /// Seconds to hold the request before letting it proceed upstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,

    /// Overrides the response status when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// Headers inserted into (or overwritten on) the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,

    /// Relative path under the saving directory to capture the response body to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_content: Option<String>,

    /// Relative path under the rewriting directory naming the replacement fixture.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite_content: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_match_any() -> String {
    ".*".to_owned()
}

fn default_methods() -> Vec<String> {
    ["GET", "POST", "PUT", "DELETE"]
        .iter()
        .map(|m| (*m).to_owned())
        .collect()
}
