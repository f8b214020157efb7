//! API-binding resolution.
//!
//! A two-level first-match search: bindings in file-name order, then each
//! binding's rules in document order. A binding is only entered at all when
//! one of its server patterns matches the destination host.

use anyhow::Context;
use regex::Regex;
use tracing::{debug, error};

use crate::config::{ApiBindingFile, ApiRule};
use crate::schema::SchemaRef;

struct CompiledApiRule {
    path: Regex,
    method: Regex,
    schema: SchemaRef,
    errors: Vec<SchemaRef>,
}

struct CompiledBinding {
    file_name: String,
    servers: Vec<Regex>,
    rules: Vec<CompiledApiRule>,
}

impl CompiledBinding {
    fn matches_host(&self, host: &str) -> bool {
        self.servers.iter().any(|server| server.is_match(host))
    }
}

/// Schema binding selected for one exchange.
#[derive(Debug)]
pub struct ResolvedApi<'a> {
    pub schema: &'a SchemaRef,
    /// Error envelopes to try, in declared order, for non-2xx responses.
    pub errors: &'a [SchemaRef],
}

/// Compiled view of the whole API map.
pub struct ApiResolver {
    bindings: Vec<CompiledBinding>,
}

impl ApiResolver {
    /// Compile every loaded binding file. A file whose patterns do not
    /// compile is skipped with a logged error, like any other malformed file.
    pub fn compile(files: Vec<ApiBindingFile>) -> Self {
        let mut bindings = Vec::new();
        for file in files {
            match compile_binding(&file) {
                Ok(binding) => bindings.push(binding),
                Err(err) => {
                    error!("skipping API rules file {}: {err:#}", file.file_name);
                }
            }
        }
        Self { bindings }
    }

    pub fn find_binding(&self, host: &str, path: &str, method: &str) -> Option<ResolvedApi<'_>> {
        for binding in &self.bindings {
            if !binding.matches_host(host) {
                continue;
            }
            for rule in &binding.rules {
                if rule.path.is_match(path) && rule.method.is_match(method) {
                    debug!(
                        "{method} {path} bound to schema '{}' by {}",
                        rule.schema, binding.file_name
                    );
                    return Some(ResolvedApi {
                        schema: &rule.schema,
                        errors: &rule.errors,
                    });
                }
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

fn compile_binding(file: &ApiBindingFile) -> Result<CompiledBinding, anyhow::Error> {
    let servers = file
        .binding
        .server
        .iter()
        .map(|pattern| {
            Regex::new(&format!("^(?:{pattern})"))
                .with_context(|| format!("invalid server pattern '{pattern}'"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let rules = file
        .binding
        .rules
        .iter()
        .map(|rule| compile_api_rule(rule, &file.binding.errors))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CompiledBinding {
        file_name: file.file_name.clone(),
        servers,
        rules,
    })
}

fn compile_api_rule(
    rule: &ApiRule,
    binding_errors: &[SchemaRef],
) -> Result<CompiledApiRule, anyhow::Error> {
    let path = Regex::new(&format!("^/*(?:{})$", rule.path))
        .with_context(|| format!("invalid path pattern '{}'", rule.path))?;
    let method = Regex::new(&format!("^(?:{})$", rule.method))
        .with_context(|| format!("invalid method pattern '{}'", rule.method))?;

    let errors = rule
        .errors
        .clone()
        .unwrap_or_else(|| binding_errors.to_vec());

    Ok(CompiledApiRule {
        path,
        method,
        schema: rule.schema.clone(),
        errors,
    })
}
