use std::sync::Arc;

use super::{MessageDescriptor, SchemaRef};

/// Outcome of resolving a [`SchemaRef`].
#[derive(Debug, Clone)]
pub enum ResolvedSchema {
    /// The `"text"` sentinel: no structured schema, bodies pass through verbatim.
    Text,
    Message(Arc<MessageDescriptor>),
}

/// Registration table mapping message name + namespace to a descriptor.
///
/// Built once at startup and immutable afterwards. When two registered
/// messages share a name, an unqualified reference resolves to whichever was
/// registered first; references should carry a `module` in that case.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    messages: Vec<Arc<MessageDescriptor>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: Arc<MessageDescriptor>) {
        self.messages.push(descriptor);
    }

    pub fn resolve(&self, schema_ref: &SchemaRef) -> Option<ResolvedSchema> {
        if schema_ref.is_text() {
            return Some(ResolvedSchema::Text);
        }
        self.resolve_message(schema_ref).map(ResolvedSchema::Message)
    }

    /// Resolve a reference that must name a structured message.
    pub fn resolve_message(&self, schema_ref: &SchemaRef) -> Option<Arc<MessageDescriptor>> {
        self.messages
            .iter()
            .find(|m| {
                m.name == schema_ref.proto_message
                    && schema_ref
                        .module
                        .as_ref()
                        .map_or(true, |module| *module == m.module)
            })
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
