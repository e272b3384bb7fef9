/*!
Content-type keyed registry of transformers.
*/

use std::collections::HashMap;

use tracing::debug;

use crate::transform::Transformer;
use crate::{Result, UssrError};

/// Maps content-type keys to the transformer that produces them
///
/// Keys are unique; registering a key again replaces the previous entry
/// without complaint and hands the displaced transformer back.
#[derive(Default)]
pub struct TransformerRegistry {
    transformers: HashMap<String, Box<dyn Transformer>>,
}

impl TransformerRegistry {
    pub fn new() -> Self {
        Self {
            transformers: HashMap::new(),
        }
    }

    /// Register `transformer` under `key`, returning any transformer it replaces
    pub fn register<K, T>(&mut self, key: K, transformer: T) -> Option<Box<dyn Transformer>>
    where
        K: Into<String>,
        T: Transformer + 'static,
    {
        let key = key.into();
        let previous = self.transformers.insert(key.clone(), Box::new(transformer));
        if previous.is_some() {
            debug!(key = %key, "Replaced registered transformer");
        }
        previous
    }

    /// Register `transformer` under the content type it produces
    pub fn register_default<T>(&mut self, transformer: T) -> Option<Box<dyn Transformer>>
    where
        T: Transformer + 'static,
    {
        let key = transformer.content_type().to_string();
        self.register(key, transformer)
    }

    pub fn get(&self, key: &str) -> Option<&dyn Transformer> {
        self.transformers.get(key).map(|transformer| transformer.as_ref())
    }

    /// Resolve `key`, failing when nothing is registered under it
    pub fn resolve(&self, key: &str) -> Result<&dyn Transformer> {
        self.get(key)
            .ok_or_else(|| UssrError::UnregisteredTransformer(key.to_string()))
    }

    /// Registered keys in sorted order
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.transformers.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }
}
