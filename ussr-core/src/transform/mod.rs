/*!
Invertible transformers and their composition.

A transformer converts a resource's payload from one representation to
another in place (`transform`) and back again (`inverse`). Transformers are
identified by the content type they produce going forward, which is also the
key they are usually registered under in a [`ResourceManager`](crate::ResourceManager).

Chains of transformers are built explicitly with [`compose`]:

```rust
use ussr_core::transform::{compose, Transformer, TransformOptions};
use ussr_core::transform::{Compress, JsonToYaml};
use ussr_core::Resource;

let pipeline = compose(vec![Box::new(JsonToYaml), Box::new(Compress::zlib(6))]);

let mut resource = Resource::in_memory("doc", br#"{"key":"value"}"#.to_vec());
pipeline.transform(&mut resource, &TransformOptions::default())?;
pipeline.inverse(&mut resource, &TransformOptions::default())?;
assert_eq!(resource.payload.as_bytes(), Some(&br#"{"key":"value"}"#[..]));
# Ok::<(), ussr_core::UssrError>(())
```
*/

mod codecs;
mod formats;

pub use codecs::{Compress, MessageParser, TextEncoder, TextEncoding};
pub use formats::{CsvToJson, JsonToYaml, YamlToJson};

use std::fmt;

use tracing::debug;

use crate::resource::{Payload, Resource};
use crate::{Result, UssrError};

/// Which way a transformer is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Inverse,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Inverse => "inverse",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options passed through a transformation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOptions {
    /// Run only the first `until` steps of a composed chain
    pub until: Option<usize>,
}

impl TransformOptions {
    pub fn until(until: usize) -> Self {
        Self { until: Some(until) }
    }
}

/// A reversible conversion of a resource's payload
///
/// Implementations mutate `resource.payload` and nothing else; content-type
/// tags are maintained by the manager that dispatches to them.
pub trait Transformer {
    /// Content type produced by a forward transformation
    fn content_type(&self) -> &str;

    /// Content type consumed by a forward transformation, when fixed
    fn source_type(&self) -> Option<&str> {
        None
    }

    /// Convert the payload to this transformer's content type
    fn transform(&self, resource: &mut Resource, options: &TransformOptions) -> Result<()>;

    /// Undo [`transform`](Transformer::transform)
    fn inverse(&self, resource: &mut Resource, options: &TransformOptions) -> Result<()>;

    /// Number of single steps this transformer performs
    fn steps(&self) -> usize {
        1
    }

    fn apply(
        &self,
        resource: &mut Resource,
        direction: Direction,
        options: &TransformOptions,
    ) -> Result<()> {
        match direction {
            Direction::Forward => self.transform(resource, options),
            Direction::Inverse => self.inverse(resource, options),
        }
    }
}

impl<T: Transformer + ?Sized> Transformer for Box<T> {
    fn content_type(&self) -> &str {
        (**self).content_type()
    }

    fn source_type(&self) -> Option<&str> {
        (**self).source_type()
    }

    fn transform(&self, resource: &mut Resource, options: &TransformOptions) -> Result<()> {
        (**self).transform(resource, options)
    }

    fn inverse(&self, resource: &mut Resource, options: &TransformOptions) -> Result<()> {
        (**self).inverse(resource, options)
    }

    fn steps(&self) -> usize {
        (**self).steps()
    }
}

/// An ordered chain of transformers that is itself a transformer
///
/// `transform` runs the steps first to last; `inverse` runs their inverses
/// last to first. With a cutoff of `until`, both directions cover steps
/// `0..until`, so an inverse exactly undoes a forward pass given the same
/// cutoff. A chain runs on a scratch copy of the resource and only writes it
/// back once every step has succeeded.
#[derive(Default)]
pub struct ComposedTransformer {
    steps: Vec<Box<dyn Transformer>>,
}

impl ComposedTransformer {
    /// Create an empty chain, which behaves as the identity
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append a step to the end of the chain
    pub fn then<T: Transformer + 'static>(mut self, step: T) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Join two chains into one flat chain
    pub fn chain(mut self, other: ComposedTransformer) -> Self {
        self.steps.extend(other.steps);
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Content types produced by each step, in order
    pub fn step_types(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.content_type()).collect()
    }

    fn cutoff(&self, until: Option<usize>) -> usize {
        until.map_or(self.steps.len(), |until| until.min(self.steps.len()))
    }
}

impl fmt::Debug for ComposedTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposedTransformer")
            .field("steps", &self.step_types())
            .finish()
    }
}

impl Transformer for ComposedTransformer {
    /// The last step's content type; an empty chain produces nothing new
    fn content_type(&self) -> &str {
        self.steps.last().map_or("", |step| step.content_type())
    }

    fn source_type(&self) -> Option<&str> {
        self.steps.first().and_then(|step| step.source_type())
    }

    fn transform(&self, resource: &mut Resource, options: &TransformOptions) -> Result<()> {
        let end = self.cutoff(options.until);
        if end == 0 {
            return Ok(());
        }

        // The cutoff applies to the outermost chain only
        let step_options = TransformOptions::default();
        let mut scratch = resource.clone();
        for (index, step) in self.steps[..end].iter().enumerate() {
            debug!(
                step = index,
                content_type = step.content_type(),
                "Applying composed step"
            );
            step.transform(&mut scratch, &step_options)?;
        }

        *resource = scratch;
        Ok(())
    }

    fn inverse(&self, resource: &mut Resource, options: &TransformOptions) -> Result<()> {
        let end = self.cutoff(options.until);
        if end == 0 {
            return Ok(());
        }

        // The cutoff applies to the outermost chain only
        let step_options = TransformOptions::default();
        let mut scratch = resource.clone();
        for (index, step) in self.steps[..end].iter().enumerate().rev() {
            debug!(
                step = index,
                content_type = step.content_type(),
                "Inverting composed step"
            );
            step.inverse(&mut scratch, &step_options)?;
        }

        *resource = scratch;
        Ok(())
    }

    fn steps(&self) -> usize {
        self.steps.iter().map(|step| step.steps()).sum()
    }
}

/// Build a chain from the given steps, applied in order
pub fn compose(steps: Vec<Box<dyn Transformer>>) -> ComposedTransformer {
    ComposedTransformer { steps }
}

/// How a textual payload was held, so converted output can be held the same way
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Repr {
    Bytes,
    Text,
}

impl Repr {
    fn wrap(self, text: String) -> Payload {
        match self {
            Repr::Bytes => Payload::Bytes(text.into_bytes()),
            Repr::Text => Payload::Text(text),
        }
    }
}

/// Borrow a bytes or text payload as UTF-8 text
fn read_text<'a>(resource: &'a Resource, format: &str) -> Result<(&'a str, Repr)> {
    match &resource.payload {
        Payload::Bytes(bytes) => std::str::from_utf8(bytes)
            .map(|text| (text, Repr::Bytes))
            .map_err(|e| UssrError::decode(format, e)),
        Payload::Text(text) => Ok((text.as_str(), Repr::Text)),
        other => Err(unexpected_payload(format, "bytes or text", other)),
    }
}

/// Borrow a bytes payload; text must be encoded first so the inverse can restore it
fn read_bytes<'a>(resource: &'a Resource, format: &str) -> Result<&'a [u8]> {
    match &resource.payload {
        Payload::Bytes(bytes) => Ok(bytes),
        other => Err(unexpected_payload(format, "bytes", other)),
    }
}

fn unexpected_payload(format: &str, expected: &str, found: &Payload) -> UssrError {
    UssrError::decode(
        format,
        format!("expected a {expected} payload, found {}", found.kind()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::LocationKind;

    /// Appends a marker on the way forward and strips it on the way back
    struct Suffix(&'static str);

    impl Transformer for Suffix {
        fn content_type(&self) -> &str {
            self.0
        }

        fn transform(&self, resource: &mut Resource, _options: &TransformOptions) -> Result<()> {
            let (text, repr) = read_text(resource, self.0)?;
            let next = format!("{text}{}", self.0);
            resource.payload = repr.wrap(next);
            Ok(())
        }

        fn inverse(&self, resource: &mut Resource, _options: &TransformOptions) -> Result<()> {
            let (text, repr) = read_text(resource, self.0)?;
            let stripped = text
                .strip_suffix(self.0)
                .ok_or_else(|| UssrError::decode(self.0, "missing suffix"))?
                .to_string();
            resource.payload = repr.wrap(stripped);
            Ok(())
        }
    }

    fn text_resource(text: &str) -> Resource {
        Resource::new("r", "", LocationKind::Memory).with_payload(text)
    }

    #[test]
    fn test_chain_applies_steps_in_order() {
        let chain = ComposedTransformer::new().then(Suffix("a")).then(Suffix("b"));
        let mut resource = text_resource("x");

        chain.transform(&mut resource, &TransformOptions::default()).unwrap();
        assert_eq!(resource.payload, Payload::Text("xab".to_string()));

        chain.inverse(&mut resource, &TransformOptions::default()).unwrap();
        assert_eq!(resource.payload, Payload::Text("x".to_string()));
    }

    #[test]
    fn test_until_limits_both_directions() {
        let chain = compose(vec![
            Box::new(Suffix("a")),
            Box::new(Suffix("b")),
            Box::new(Suffix("c")),
        ]);
        let mut resource = text_resource("x");

        chain.transform(&mut resource, &TransformOptions::until(2)).unwrap();
        assert_eq!(resource.payload, Payload::Text("xab".to_string()));

        chain.inverse(&mut resource, &TransformOptions::until(2)).unwrap();
        assert_eq!(resource.payload, Payload::Text("x".to_string()));
    }

    #[test]
    fn test_until_beyond_length_is_clamped() {
        let chain = ComposedTransformer::new().then(Suffix("a"));
        let mut resource = text_resource("x");

        chain.transform(&mut resource, &TransformOptions::until(10)).unwrap();
        assert_eq!(resource.payload, Payload::Text("xa".to_string()));
    }

    #[test]
    fn test_empty_chain_is_identity() {
        let chain = ComposedTransformer::new();
        let mut resource = text_resource("x");

        chain.transform(&mut resource, &TransformOptions::default()).unwrap();
        chain.inverse(&mut resource, &TransformOptions::default()).unwrap();

        assert_eq!(resource, text_resource("x"));
        assert_eq!(chain.content_type(), "");
        assert_eq!(chain.steps(), 0);
    }

    #[test]
    fn test_failing_step_leaves_resource_untouched() {
        let chain = ComposedTransformer::new().then(Suffix("a")).then(Suffix("b"));
        let mut resource = text_resource("no suffix here");

        let result = chain.inverse(&mut resource, &TransformOptions::default());

        assert!(result.unwrap_err().is_decode());
        assert_eq!(resource, text_resource("no suffix here"));
    }

    #[test]
    fn test_nested_chains_compose() {
        let inner = ComposedTransformer::new().then(Suffix("a")).then(Suffix("b"));
        let outer = ComposedTransformer::new().then(inner).then(Suffix("c"));
        let mut resource = text_resource("x");

        assert_eq!(outer.len(), 2);
        assert_eq!(outer.steps(), 3);
        assert_eq!(outer.content_type(), "c");

        // The cutoff counts outer steps; the nested chain runs in full
        outer.transform(&mut resource, &TransformOptions::until(1)).unwrap();
        assert_eq!(resource.payload, Payload::Text("xab".to_string()));
    }

    #[test]
    fn test_chain_flattens_two_chains() {
        let first = ComposedTransformer::new().then(Suffix("a"));
        let second = ComposedTransformer::new().then(Suffix("b")).then(Suffix("c"));

        let joined = first.chain(second);
        assert_eq!(joined.len(), 3);
        assert_eq!(joined.step_types(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_direction_dispatch() {
        let step = Suffix("a");
        let mut resource = text_resource("x");

        step.apply(&mut resource, Direction::Forward, &TransformOptions::default())
            .unwrap();
        assert_eq!(resource.payload, Payload::Text("xa".to_string()));

        step.apply(&mut resource, Direction::Inverse, &TransformOptions::default())
            .unwrap();
        assert_eq!(resource.payload, Payload::Text("x".to_string()));
        assert_eq!(Direction::Inverse.to_string(), "inverse");
    }
}
