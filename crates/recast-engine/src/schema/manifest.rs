//! Built-in descriptor manifest.
//!
//! The equivalent of the generated message modules the engine is normally
//! deployed with. Hosts embedding the engine against a different API register
//! their own descriptors instead of (or on top of) these.

use std::sync::Arc;

use super::{field, FieldKind, MessageDescriptor, SchemaRegistry};

/// Generic error envelope returned for failed requests.
pub fn http_error() -> Arc<MessageDescriptor> {
    MessageDescriptor::new(
        "general",
        "HttpError",
        vec![
            field(1, "status", FieldKind::Int32),
            field(2, "message", FieldKind::String).required(),
        ],
    )
}

/// Per-field validation errors, used by form-style endpoints.
pub fn http_form_errors() -> Arc<MessageDescriptor> {
    let form_error = MessageDescriptor::new(
        "general",
        "FormError",
        vec![
            field(1, "field", FieldKind::String).required(),
            field(2, "message", FieldKind::String),
        ],
    );
    MessageDescriptor::new(
        "general",
        "HttpFormErrors",
        vec![field(1, "formErrors", FieldKind::Message(form_error))
            .repeated()
            .required()],
    )
}

pub fn message() -> Arc<MessageDescriptor> {
    MessageDescriptor::new(
        "general",
        "Message",
        vec![field(1, "text", FieldKind::String)],
    )
}

pub fn app_info() -> Arc<MessageDescriptor> {
    MessageDescriptor::new(
        "general",
        "AppInfoV2",
        vec![
            field(1, "version", FieldKind::String).required(),
            field(2, "build", FieldKind::Int32),
            field(3, "features", FieldKind::String).repeated(),
        ],
    )
}

pub fn account() -> Arc<MessageDescriptor> {
    MessageDescriptor::new(
        "accounts",
        "Account",
        vec![
            field(1, "accountId", FieldKind::Int64).required(),
            field(2, "login", FieldKind::String),
            field(3, "active", FieldKind::Bool),
            field(4, "services", FieldKind::String).repeated(),
            field(5, "balance", FieldKind::Double),
        ],
    )
}

/// Registry pre-loaded with every built-in message.
pub fn builtin() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    registry.register(http_error());
    registry.register(http_form_errors());
    registry.register(message());
    registry.register(app_info());
    registry.register(account());
    registry
}
