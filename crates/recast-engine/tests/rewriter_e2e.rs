//! End-to-end scenarios: rule document + API map + fixtures on disk, driven
//! through the two host callbacks.

use std::fs;

use hyper::{HeaderMap, Method, StatusCode};
use serde_json::json;
use tempfile::TempDir;

use recast_engine::codec;
use recast_engine::schema::{field, manifest, FieldKind, MessageDescriptor, SchemaRegistry};
use recast_engine::{EngineConfig, HttpExchange, Rewriter};

struct FakeExchange {
    host: String,
    path: String,
    method: Method,
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl FakeExchange {
    fn new(host: &str, path: &str, method: Method) -> Self {
        Self {
            host: host.to_owned(),
            path: path.to_owned(),
            method,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }
}

impl HttpExchange for FakeExchange {
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

fn item_descriptor() -> std::sync::Arc<MessageDescriptor> {
    MessageDescriptor::new(
        "catalog",
        "Item",
        vec![
            field(1, "itemId", FieldKind::Int64).required(),
            field(2, "title", FieldKind::String),
        ],
    )
}

fn test_registry() -> SchemaRegistry {
    let mut registry = manifest::builtin();
    registry.register(item_descriptor());
    registry
}

/// Lay out a config tree in a tempdir and construct the engine over it.
fn build_engine(
    rules_json: &str,
    api_json: &str,
    fixtures: &[(&str, &str)],
) -> (Rewriter, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig::rooted_at(dir.path());

    fs::create_dir_all(config.rules_file.parent().unwrap()).unwrap();
    fs::write(&config.rules_file, rules_json).unwrap();

    fs::create_dir_all(&config.api_rules_dir).unwrap();
    fs::write(config.api_rules_dir.join("api.json"), api_json).unwrap();

    fs::create_dir_all(&config.rewriting_dir).unwrap();
    for (name, content) in fixtures {
        fs::write(config.rewriting_dir.join(name), content).unwrap();
    }

    let engine = Rewriter::new(&config, test_registry()).unwrap();
    (engine, dir)
}

const ITEM_API: &str = r#"{
    "server": [".*"],
    "rules": [
        {"path": "/item", "method": "GET", "proto_message": "Item", "module": "catalog"}
    ],
    "errors": [
        {"proto_message": "HttpFormErrors", "module": "general"},
        {"proto_message": "HttpError", "module": "general"}
    ]
}"#;

#[test]
fn rewrites_item_fixture_into_wire_encoding() {
    let (engine, _dir) = build_engine(
        r#"[{"path_expr": "/item", "method": ["GET"], "status_code": 200,
             "rewrite_content": "item.json"}]"#,
        ITEM_API,
        &[("item.json", r#"{"item_id": 7}"#)],
    );

    let mut exchange = FakeExchange::new("api.example.com", "/item", Method::GET);
    exchange.status = StatusCode::BAD_GATEWAY;
    exchange.body = b"upstream garbage".to_vec();

    engine.on_response(&mut exchange);

    assert_eq!(exchange.status, StatusCode::OK);
    // Item { itemId: 7 }: field 1, varint 7.
    assert_eq!(exchange.body, vec![0x08, 0x07]);
}

#[test]
fn error_status_encodes_with_first_fitting_error_schema() {
    let (engine, _dir) = build_engine(
        r#"[{"path_expr": "/item", "method": ["GET"], "rewrite_content": "error.json"}]"#,
        ITEM_API,
        &[("error.json", r#"{"status": 404, "message": "no such item"}"#)],
    );

    let mut exchange = FakeExchange::new("api.example.com", "/item", Method::GET);
    exchange.status = StatusCode::NOT_FOUND;

    engine.on_response(&mut exchange);

    // The fixture has no formErrors key, so HttpFormErrors rejects it and
    // the body comes out encoded as HttpError.
    let decoded = codec::decode(&exchange.body, &manifest::http_error()).unwrap();
    assert_eq!(decoded, json!({"status": 404, "message": "no such item"}));
}

#[test]
fn form_error_fixture_prefers_first_error_schema() {
    let (engine, _dir) = build_engine(
        r#"[{"path_expr": "/item", "method": ["GET"], "rewrite_content": "form.json"}]"#,
        ITEM_API,
        &[(
            "form.json",
            r#"{"form_errors": [{"field": "item_id", "message": "must be positive"}]}"#,
        )],
    );

    let mut exchange = FakeExchange::new("api.example.com", "/item", Method::GET);
    exchange.status = StatusCode::UNPROCESSABLE_ENTITY;

    engine.on_response(&mut exchange);

    let decoded = codec::decode(&exchange.body, &manifest::http_form_errors()).unwrap();
    assert_eq!(
        decoded,
        json!({"formErrors": [{"field": "item_id", "message": "must be positive"}]})
    );
}

#[test]
fn snake_case_fixture_keys_reach_the_wire_as_camel_case() {
    let (engine, _dir) = build_engine(
        r#"[{"path_expr": "/item", "method": ["GET"], "rewrite_content": "item.json"}]"#,
        ITEM_API,
        &[("item.json", r#"{"item_id": 7, "title": "first"}"#)],
    );

    let mut exchange = FakeExchange::new("api.example.com", "/item", Method::GET);
    engine.on_response(&mut exchange);

    let decoded = codec::decode(&exchange.body, &item_descriptor()).unwrap();
    assert_eq!(decoded, json!({"itemId": 7, "title": "first"}));
}

#[test]
fn captures_structured_body_as_json_fixture() {
    let (engine, dir) = build_engine(
        r#"[{"path_expr": "/item", "method": ["GET"], "save_content": "captures/item.json"}]"#,
        ITEM_API,
        &[],
    );

    let mut exchange = FakeExchange::new("api.example.com", "/item", Method::GET);
    exchange.body = codec::encode(&json!({"itemId": 7, "title": "first"}), &[item_descriptor()])
        .unwrap()
        .to_vec();

    engine.on_response(&mut exchange);

    let saved = dir.path().join("data/saves/captures/item1.json");
    let tree: serde_json::Value = serde_json::from_str(&fs::read_to_string(&saved).unwrap()).unwrap();
    assert_eq!(tree, json!({"itemId": 7, "title": "first"}));

    // A second capture of the same endpoint gets the next free slot.
    engine.on_response(&mut exchange);
    assert!(dir.path().join("data/saves/captures/item2.json").exists());
}

#[test]
fn captured_fixture_replays_to_identical_bytes() {
    let (engine, dir) = build_engine(
        r#"[{"path_expr": "/item", "method": ["GET"], "save_content": "item.json"}]"#,
        ITEM_API,
        &[],
    );

    let original = codec::encode(&json!({"itemId": 42, "title": "loop"}), &[item_descriptor()])
        .unwrap()
        .to_vec();
    let mut exchange = FakeExchange::new("api.example.com", "/item", Method::GET);
    exchange.body = original.clone();
    engine.on_response(&mut exchange);

    // Promote the capture to a replay fixture: captured keys are already
    // wire-cased, so the case translation is a no-op on the way back.
    let captured = dir.path().join("data/saves/item1.json");
    fs::copy(&captured, dir.path().join("data/fake_server/item.json")).unwrap();

    let config = EngineConfig::rooted_at(dir.path());
    fs::write(
        &config.rules_file,
        r#"[{"path_expr": "/item", "method": ["GET"], "rewrite_content": "item.json"}]"#,
    )
    .unwrap();
    let replay_engine = Rewriter::new(&config, test_registry()).unwrap();

    let mut replayed = FakeExchange::new("api.example.com", "/item", Method::GET);
    replay_engine.on_response(&mut replayed);
    assert_eq!(replayed.body, original);
}

#[test]
fn captures_text_body_verbatim() {
    let (engine, dir) = build_engine(
        r#"[{"path_expr": "/motd", "save_content": "motd.txt"}]"#,
        r#"{"server": [".*"],
            "rules": [{"path": "/motd", "method": ".*", "proto_message": "text"}]}"#,
        &[],
    );

    let mut exchange = FakeExchange::new("api.example.com", "/motd", Method::GET);
    exchange.body = b"plain maintenance note".to_vec();
    engine.on_response(&mut exchange);

    let saved = fs::read_to_string(dir.path().join("data/saves/motd1.txt")).unwrap();
    assert_eq!(saved, "plain maintenance note");
}

#[test]
fn unmatched_host_binding_stops_the_rewrite() {
    let (engine, _dir) = build_engine(
        r#"[{"path_expr": "/item", "method": ["GET"], "rewrite_content": "item.json"}]"#,
        r#"{"server": ["internal\\.only"],
            "rules": [{"path": "/item", "method": "GET", "proto_message": "Item", "module": "catalog"}]}"#,
        &[("item.json", r#"{"item_id": 7}"#)],
    );

    let mut exchange = FakeExchange::new("api.example.com", "/item", Method::GET);
    exchange.body = b"untouched".to_vec();
    engine.on_response(&mut exchange);

    assert_eq!(exchange.body, b"untouched");
}

#[test]
fn broken_fixture_never_substitutes_a_default_body() {
    let (engine, _dir) = build_engine(
        r#"[{"path_expr": "/item", "method": ["GET"], "rewrite_content": "item.json"}]"#,
        ITEM_API,
        // Fits neither the primary nor any error schema.
        &[("item.json", r#"{"unrelated_key": true}"#)],
    );

    let mut exchange = FakeExchange::new("api.example.com", "/item", Method::GET);
    exchange.body = b"upstream body".to_vec();
    engine.on_response(&mut exchange);

    assert_eq!(exchange.body, b"upstream body");
}
