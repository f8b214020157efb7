//! Ordered rule matching.
//!
//! Rules are compiled once at engine construction; lookups walk the document
//! order and the first rule whose predicates all hold wins. Overlapping
//! patterns therefore resolve by position, not specificity, matching how the
//! configuration editor presents the list.

pub mod api;

use anyhow::Context;
use hyper::{Method, StatusCode};
use regex::Regex;

use crate::config::Rule;

pub struct CompiledRule {
    rule: Rule,
    authority: Regex,
    path: Regex,
    status: Option<StatusCode>,
}

impl CompiledRule {
    pub fn compile(rule: Rule) -> Result<Self, anyhow::Error> {
        // Authority is a prefix match; the path consumes the whole string
        // after any run of leading slashes.
        let authority = Regex::new(&format!("^(?:{})", rule.authority_expr))
            .with_context(|| format!("invalid authority_expr '{}'", rule.authority_expr))?;
        let path = Regex::new(&format!("^/*(?:{})$", rule.path_expr))
            .with_context(|| format!("invalid path_expr '{}'", rule.path_expr))?;

        let status = rule
            .status_code
            .map(StatusCode::from_u16)
            .transpose()
            .with_context(|| format!("invalid status_code in rule '{}'", rule.path_expr))?;

        if let Some(delay) = rule.delay {
            if !delay.is_finite() || delay < 0.0 {
                anyhow::bail!("invalid delay {delay} in rule '{}'", rule.path_expr);
            }
        }

        Ok(Self {
            rule,
            authority,
            path,
            status,
        })
    }

    pub fn matches(&self, host: &str, path: &str, method: &Method) -> bool {
        self.rule.is_on
            && self.authority.is_match(host)
            && self.path.is_match(path)
            && self.rule.method.iter().any(|m| m == method.as_str())
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }
}

/// The compiled rule document.
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile the whole document; any invalid rule is fatal.
    pub fn compile(rules: Vec<Rule>) -> Result<Self, anyhow::Error> {
        let rules = rules
            .into_iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// First enabled rule in document order whose predicates all match.
    pub fn find_rule(&self, host: &str, path: &str, method: &Method) -> Option<&CompiledRule> {
        self.rules.iter().find(|rule| rule.matches(host, path, method))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
