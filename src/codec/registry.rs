//! Content-type → codec table.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::{media_type, Codec, CodecError, FormCodec, JsonCodec, DEFAULT_CONTENT_TYPE, FORM_CONTENT_TYPE};

/// Shared codec table.
///
/// Registration normally happens before serving; late registration is
/// allowed and takes the write lock.
#[derive(Debug, Default)]
pub struct CodecRegistry {
    codecs: RwLock<HashMap<String, Arc<dyn Codec>>>,
}

impl CodecRegistry {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the JSON and form codecs registered.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(DEFAULT_CONTENT_TYPE, JsonCodec);
        registry.register(FORM_CONTENT_TYPE, FormCodec);
        registry
    }

    /// Register (or replace) the codec for `content_type`.
    pub fn register(&self, content_type: &str, codec: impl Codec + 'static) {
        self.register_arc(content_type, Arc::new(codec));
    }

    pub fn register_arc(&self, content_type: &str, codec: Arc<dyn Codec>) {
        let key = media_type(content_type);
        tracing::debug!(content_type = %key, codec = codec.name(), "Codec registered");
        self.codecs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, codec);
    }

    /// Resolve the codec for a content-type header value.
    pub fn lookup(&self, content_type: &str) -> Result<Arc<dyn Codec>, CodecError> {
        let key = media_type(content_type);
        self.codecs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
            .ok_or(CodecError::UnknownContentType(key))
    }

    /// Registered media types, sorted.
    pub fn content_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .codecs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        types.sort();
        types
    }
}
