//! Engine configuration: document paths and loaders.

mod api_map;
mod rules;

pub use api_map::{load_api_map, ApiBinding, ApiBindingFile, ApiRule};
pub use rules::Rule;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::info;

/// Where the engine finds its documents and fixture directories.
///
/// Each primary location may carry an example fallback, used when the primary
/// is absent so a fresh deployment works out of the box. The fallbacks for
/// the rewriting directory and API-rules directory only apply together with
/// the example rule document.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// The rule document (a JSON array of rules).
    pub rules_file: PathBuf,
    pub example_rules_file: Option<PathBuf>,

    /// Directory of API-map files.
    pub api_rules_dir: PathBuf,
    pub example_api_rules_dir: Option<PathBuf>,

    /// Fixtures served on the rewrite path live here.
    pub rewriting_dir: PathBuf,
    pub example_rewriting_dir: Option<PathBuf>,

    /// Captured response bodies are written here.
    pub saving_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rules_file: "data/config.json".into(),
            example_rules_file: Some("data/example_config.json".into()),
            api_rules_dir: "data/api_rules".into(),
            example_api_rules_dir: Some("data/api_rules/example".into()),
            rewriting_dir: "data/fake_server".into(),
            example_rewriting_dir: Some("data/fake_server/example".into()),
            saving_dir: "data/saves".into(),
        }
    }
}

/// Concrete locations after example fallback has been applied.
#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub rules_file: PathBuf,
    pub api_rules_dir: PathBuf,
    pub rewriting_dir: PathBuf,
    pub saving_dir: PathBuf,
}

impl EngineConfig {
    /// Construct a config rooted at `base`, with the stock directory layout.
    pub fn rooted_at(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        let defaults = Self::default();
        let join = |p: &PathBuf| base.join(p);
        Self {
            rules_file: join(&defaults.rules_file),
            example_rules_file: defaults.example_rules_file.as_ref().map(&join),
            api_rules_dir: join(&defaults.api_rules_dir),
            example_api_rules_dir: defaults.example_api_rules_dir.as_ref().map(&join),
            rewriting_dir: join(&defaults.rewriting_dir),
            example_rewriting_dir: defaults.example_rewriting_dir.as_ref().map(&join),
            saving_dir: join(&defaults.saving_dir),
        }
    }

    /// Apply the example fallbacks.
    pub fn resolve(&self) -> ResolvedPaths {
        let use_example = !self.rules_file.exists();
        let pick = |primary: &PathBuf, example: &Option<PathBuf>| {
            if use_example {
                if let Some(example) = example {
                    if example.exists() {
                        return example.clone();
                    }
                }
            }
            primary.clone()
        };

        let resolved = ResolvedPaths {
            rules_file: pick(&self.rules_file, &self.example_rules_file),
            api_rules_dir: pick(&self.api_rules_dir, &self.example_api_rules_dir),
            rewriting_dir: pick(&self.rewriting_dir, &self.example_rewriting_dir),
            saving_dir: self.saving_dir.clone(),
        };
        if use_example {
            info!(
                "rule document {} is absent, using example configuration",
                self.rules_file.display()
            );
        }
        resolved
    }

    /// Load and parse the rule document. Any failure here is fatal.
    pub fn load_rules(&self, resolved: &ResolvedPaths) -> anyhow::Result<Vec<Rule>> {
        let contents = fs::read_to_string(&resolved.rules_file).with_context(|| {
            format!("cannot read rule document {}", resolved.rules_file.display())
        })?;
        let rules: Vec<Rule> = serde_json::from_str(&contents).with_context(|| {
            format!("invalid rule document {}", resolved.rules_file.display())
        })?;
        info!(
            "loaded {} rules from {}",
            rules.len(),
            resolved.rules_file.display()
        );
        Ok(rules)
    }
}
