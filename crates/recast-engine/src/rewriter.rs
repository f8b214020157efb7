//! Per-exchange orchestration.
//!
//! The hosting proxy invokes [`Rewriter::on_request`] once the request
//! headers are complete and [`Rewriter::on_response`] once the full response
//! has been read. All state is immutable after construction, so one engine
//! instance serves any number of concurrent exchanges; everything derived
//! per exchange is threaded through as values.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use hyper::header::{HeaderName, HeaderValue};
use hyper::StatusCode;
use tracing::{debug, error, info, warn};

use crate::codec::{self, case};
use crate::config::{load_api_map, EngineConfig};
use crate::error::EngineError;
use crate::exchange::HttpExchange;
use crate::fixture::FixtureStore;
use crate::matcher::api::{ApiResolver, ResolvedApi};
use crate::matcher::{CompiledRule, RuleSet};
use crate::schema::{MessageDescriptor, ResolvedSchema, SchemaRegistry};

pub struct Rewriter {
    rules: RuleSet,
    api: ApiResolver,
    registry: SchemaRegistry,
    store: FixtureStore,
    api_rules_dir: PathBuf,
}

impl Rewriter {
    /// Load the rule document and API map and compile them.
    ///
    /// A malformed rule document is fatal; malformed API-map files are
    /// skipped individually during loading.
    pub fn new(config: &EngineConfig, registry: SchemaRegistry) -> anyhow::Result<Self> {
        let paths = config.resolve();

        let rules = RuleSet::compile(config.load_rules(&paths)?)?;

        let bindings = match load_api_map(&paths.api_rules_dir) {
            Ok(bindings) => bindings,
            Err(err) => {
                error!(
                    "cannot read API rules directory {}: {err}",
                    paths.api_rules_dir.display()
                );
                Vec::new()
            }
        };
        let api = ApiResolver::compile(bindings);
        info!("engine ready: {} rules, {} API bindings", rules.len(), api.len());

        Ok(Self {
            rules,
            api,
            registry,
            store: FixtureStore::new(paths.saving_dir, paths.rewriting_dir),
            api_rules_dir: paths.api_rules_dir,
        })
    }

    /// Request-phase hook: hold the exchange for the matched rule's delay.
    ///
    /// The sleep suspends only the task handling this exchange; the host is
    /// expected to dispatch request handling per exchange, so one delayed
    /// request never stalls unrelated traffic. The request itself passes
    /// through unmodified.
    pub async fn on_request<E: HttpExchange>(&self, exchange: &E) {
        let rule = match self.rules.find_rule(
            exchange.request_host(),
            exchange.request_path(),
            exchange.request_method(),
        ) {
            Some(rule) => rule,
            None => return,
        };

        if let Some(delay) = rule.rule().delay {
            debug!(
                "holding {} {} for {delay}s",
                exchange.request_method(),
                exchange.request_path()
            );
            tokio::time::sleep(Duration::from_secs_f64(delay)).await;
        }
    }

    /// Response-phase hook: status/header mutation, capture and rewrite.
    pub fn on_response<E: HttpExchange>(&self, exchange: &mut E) {
        let rule = match self.rules.find_rule(
            exchange.request_host(),
            exchange.request_path(),
            exchange.request_method(),
        ) {
            Some(rule) => rule,
            None => return,
        };
        info!(
            "{} {} matched rule '{}'",
            exchange.request_method(),
            exchange.request_path(),
            rule.rule().path_expr
        );

        if let Some(status) = rule.status() {
            exchange.set_response_status(status);
        }

        if let Some(headers) = &rule.rule().headers {
            let target = exchange.response_headers_mut();
            for (name, value) in headers {
                match (HeaderName::try_from(name.as_str()), HeaderValue::from_str(value)) {
                    (Ok(parsed_name), Ok(parsed_value)) => {
                        target.insert(parsed_name, parsed_value);
                    }
                    _ => warn!("rule '{}' carries unusable header '{name}'", rule.rule().path_expr),
                }
            }
        }

        if rule.rule().save_content.is_none() && rule.rule().rewrite_content.is_none() {
            return;
        }

        // Status and header mutations above are kept even when the content
        // step fails; the failure is scoped to this one exchange.
        if let Err(err) = self.apply_content(exchange, rule) {
            error!("content step failed for {}: {err}", exchange.request_url());
        }
    }

    fn apply_content<E: HttpExchange>(
        &self,
        exchange: &mut E,
        rule: &CompiledRule,
    ) -> Result<(), EngineError> {
        let host = exchange.request_host().to_owned();
        let path = exchange.request_path().to_owned();
        let method = exchange.request_method().as_str().to_owned();

        let resolved = self.api.find_binding(&host, &path, &method).ok_or_else(|| {
            EngineError::NoBinding {
                url: exchange.request_url(),
                api_rules_dir: self.api_rules_dir.clone(),
            }
        })?;

        let schema = self
            .registry
            .resolve(resolved.schema)
            .ok_or_else(|| EngineError::UnknownSchema {
                schema: resolved.schema.to_string(),
                url: exchange.request_url(),
            })?;

        if let Some(relative) = &rule.rule().save_content {
            self.capture(exchange, &schema, relative)?;
        }
        if let Some(relative) = &rule.rule().rewrite_content {
            self.rewrite(exchange, &resolved, &schema, relative)?;
        }
        Ok(())
    }

    /// Capture the current response body under the saving directory.
    fn capture<E: HttpExchange>(
        &self,
        exchange: &E,
        schema: &ResolvedSchema,
        relative: &str,
    ) -> Result<(), EngineError> {
        match schema {
            ResolvedSchema::Text => {
                self.store.save(relative, &exchange.response_body_text())?;
            }
            ResolvedSchema::Message(descriptor) => {
                let tree = codec::decode(exchange.response_body(), descriptor)?;
                let pretty = serde_json::to_string_pretty(&tree).map_err(|err| {
                    std::io::Error::new(std::io::ErrorKind::InvalidData, err.to_string())
                })?;
                self.store.save(relative, &pretty)?;
            }
        }
        Ok(())
    }

    /// Replace the response body with the named fixture.
    fn rewrite<E: HttpExchange>(
        &self,
        exchange: &mut E,
        resolved: &ResolvedApi<'_>,
        schema: &ResolvedSchema,
        relative: &str,
    ) -> Result<(), EngineError> {
        let content = self.store.read(relative)?;

        match schema {
            ResolvedSchema::Text => {
                debug!("replacing body verbatim from {relative}");
                exchange.set_response_body(content.into_bytes());
            }
            ResolvedSchema::Message(primary) => {
                let mut tree: serde_json::Value =
                    serde_json::from_str(&content).map_err(|err| EngineError::InvalidFixture {
                        path: self.store.rewriting_path(relative).display().to_string(),
                        reason: err.to_string(),
                    })?;
                case::camelize_keys(&mut tree);

                let candidates =
                    self.encode_candidates(exchange.response_status(), primary, resolved);
                let bytes = codec::encode(&tree, &candidates)?;
                exchange.set_response_body(bytes.to_vec());
            }
        }
        Ok(())
    }

    /// Schemas to try for the rewrite, picked by the current response status.
    fn encode_candidates(
        &self,
        status: StatusCode,
        primary: &Arc<MessageDescriptor>,
        resolved: &ResolvedApi<'_>,
    ) -> Vec<Arc<MessageDescriptor>> {
        if status.is_success() || resolved.errors.is_empty() {
            return vec![primary.clone()];
        }
        let mut candidates = Vec::with_capacity(resolved.errors.len());
        for error_ref in resolved.errors {
            match self.registry.resolve_message(error_ref) {
                Some(descriptor) => candidates.push(descriptor),
                None => warn!("error schema '{error_ref}' is not registered, ignoring"),
            }
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::manifest;
    use hyper::{HeaderMap, Method};
    use std::fs;

    struct TestExchange {
        host: String,
        path: String,
        method: Method,
        status: StatusCode,
        headers: HeaderMap,
        body: Vec<u8>,
    }

    impl TestExchange {
        fn get(host: &str, path: &str) -> Self {
            Self {
                host: host.to_owned(),
                path: path.to_owned(),
                method: Method::GET,
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: Vec::new(),
            }
        }
    }

    impl HttpExchange for TestExchange {
        fn request_host(&self) -> &str {
            &self.host
        }
        fn request_path(&self) -> &str {
            &self.path
        }
        fn request_method(&self) -> &Method {
            &self.method
        }
        fn response_status(&self) -> StatusCode {
            self.status
        }
        fn set_response_status(&mut self, status: StatusCode) {
            self.status = status;
        }
        fn response_headers_mut(&mut self) -> &mut HeaderMap {
            &mut self.headers
        }
        fn response_body(&self) -> &[u8] {
            &self.body
        }
        fn set_response_body(&mut self, body: Vec<u8>) {
            self.body = body;
        }
    }

    fn engine_with(rules_json: &str, api_json: Option<&str>) -> (Rewriter, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::rooted_at(dir.path());
        fs::create_dir_all(&config.api_rules_dir).unwrap();
        fs::create_dir_all(&config.rewriting_dir).unwrap();
        fs::create_dir_all(config.rules_file.parent().unwrap()).unwrap();
        fs::write(&config.rules_file, rules_json).unwrap();
        if let Some(api_json) = api_json {
            fs::write(config.api_rules_dir.join("api.json"), api_json).unwrap();
        }
        let engine = Rewriter::new(&config, manifest::builtin()).unwrap();
        (engine, dir)
    }

    #[test]
    fn test_unmatched_exchange_is_untouched() {
        let (engine, _dir) = engine_with(r#"[{"path_expr": "/item", "status_code": 503}]"#, None);
        let mut exchange = TestExchange::get("example.com", "/other");

        engine.on_response(&mut exchange);
        assert_eq!(exchange.status, StatusCode::OK);
    }

    #[test]
    fn test_status_and_headers_are_applied() {
        let (engine, _dir) = engine_with(
            r#"[{"path_expr": "/item", "status_code": 418,
                 "headers": {"x-served-by": "recast", "content-type": "text/plain"}}]"#,
            None,
        );
        let mut exchange = TestExchange::get("example.com", "/item");
        exchange
            .headers
            .insert("content-type", "application/octet-stream".parse().unwrap());
        exchange.headers.insert("x-keep", "1".parse().unwrap());

        engine.on_response(&mut exchange);

        assert_eq!(exchange.status, StatusCode::IM_A_TEAPOT);
        assert_eq!(exchange.headers.get("x-served-by").unwrap(), "recast");
        // Overwritten, not appended.
        assert_eq!(exchange.headers.get("content-type").unwrap(), "text/plain");
        // Unrelated headers survive.
        assert_eq!(exchange.headers.get("x-keep").unwrap(), "1");
    }

    #[test]
    fn test_missing_binding_keeps_applied_mutations() {
        let (engine, _dir) = engine_with(
            r#"[{"path_expr": "/item", "status_code": 200, "rewrite_content": "item.json"}]"#,
            None,
        );
        let mut exchange = TestExchange::get("example.com", "/item");
        exchange.body = b"original".to_vec();
        exchange.status = StatusCode::BAD_GATEWAY;

        engine.on_response(&mut exchange);

        // Status override was applied before the lookup failed...
        assert_eq!(exchange.status, StatusCode::OK);
        // ...and the body is left alone.
        assert_eq!(exchange.body, b"original");
    }

    #[test]
    fn test_text_schema_replaces_body_verbatim() {
        let (engine, _dir) = engine_with(
            r#"[{"path_expr": "/motd", "rewrite_content": "motd.txt"}]"#,
            Some(r#"{"server": [".*"], "rules": [{"path": "/motd", "method": "GET", "proto_message": "text"}]}"#),
        );
        fs::write(engine.store.rewriting_path("motd.txt"), "maintenance tonight").unwrap();

        let mut exchange = TestExchange::get("example.com", "/motd");
        exchange.body = b"old".to_vec();
        engine.on_response(&mut exchange);

        assert_eq!(exchange.body, b"maintenance tonight");
    }

    #[test]
    fn test_missing_fixture_leaves_body_alone() {
        let (engine, _dir) = engine_with(
            r#"[{"path_expr": "/motd", "rewrite_content": "absent.txt"}]"#,
            Some(r#"{"server": [".*"], "rules": [{"path": "/motd", "method": "GET", "proto_message": "text"}]}"#),
        );
        let mut exchange = TestExchange::get("example.com", "/motd");
        exchange.body = b"old".to_vec();
        engine.on_response(&mut exchange);

        assert_eq!(exchange.body, b"old");
    }

    #[tokio::test]
    async fn test_request_delay_holds_the_exchange() {
        let (engine, _dir) = engine_with(r#"[{"path_expr": "/slow", "delay": 0.2}]"#, None);
        let exchange = TestExchange::get("example.com", "/slow");

        let before = std::time::Instant::now();
        engine.on_request(&exchange).await;
        assert!(before.elapsed() >= Duration::from_millis(190));
    }

    #[tokio::test]
    async fn test_request_without_delay_returns_immediately() {
        let (engine, _dir) = engine_with(r#"[{"path_expr": "/fast"}]"#, None);
        let exchange = TestExchange::get("example.com", "/fast");

        let before = std::time::Instant::now();
        engine.on_request(&exchange).await;
        assert!(before.elapsed() < Duration::from_millis(100));
    }
}
