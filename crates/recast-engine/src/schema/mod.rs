//! Wire-schema descriptors.
//!
//! Messages are described by an explicit descriptor table built once at
//! startup (see [`manifest`]); there is no reflection or dynamic loading.
//! Field names are the declared wire names (camelCase), which is also the
//! casing used for captured fixtures.

mod registry;

pub mod manifest;

pub use registry::{ResolvedSchema, SchemaRegistry};

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Sentinel message name meaning "no structured schema, treat as text".
pub const TEXT_SCHEMA: &str = "text";

/// Reference to a wire schema as written in the API-map documents.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SchemaRef {
    pub proto_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

impl SchemaRef {
    pub fn new(proto_message: impl Into<String>, module: Option<&str>) -> Self {
        Self {
            proto_message: proto_message.into(),
            module: module.map(str::to_owned),
        }
    }

    pub fn is_text(&self) -> bool {
        self.proto_message == TEXT_SCHEMA
    }
}

impl fmt::Display for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.module {
            Some(module) => write!(f, "{}.{}", module, self.proto_message),
            None => f.write_str(&self.proto_message),
        }
    }
}

/// Scalar or nested type of a message field.
#[derive(Debug, Clone)]
pub enum FieldKind {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Bool,
    String,
    Bytes,
    Message(Arc<MessageDescriptor>),
}

impl FieldKind {
    /// Kinds that may appear in a packed repeated field on the wire.
    pub(crate) fn is_packable(&self) -> bool {
        !matches!(
            self,
            FieldKind::String | FieldKind::Bytes | FieldKind::Message(_)
        )
    }
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Declared wire name, camelCase.
    pub name: String,
    pub number: u32,
    pub kind: FieldKind,
    pub repeated: bool,
    pub required: bool,
}

/// Shorthand used by descriptor manifests.
pub fn field(number: u32, name: &str, kind: FieldKind) -> FieldDescriptor {
    FieldDescriptor {
        name: name.to_owned(),
        number,
        kind,
        repeated: false,
        required: false,
    }
}

impl FieldDescriptor {
    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

#[derive(Debug)]
pub struct MessageDescriptor {
    pub name: String,
    /// Namespace the message belongs to, e.g. a generated module name.
    pub module: String,
    pub fields: Vec<FieldDescriptor>,
}

impl MessageDescriptor {
    pub fn new(module: &str, name: &str, fields: Vec<FieldDescriptor>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_owned(),
            module: module.to_owned(),
            fields,
        })
    }

    pub fn full_name(&self) -> String {
        format!("{}.{}", self.module, self.name)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_by_number(&self, number: u32) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.number == number)
    }
}
