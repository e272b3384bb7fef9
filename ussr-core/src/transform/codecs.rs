//! Content-agnostic byte codecs: compression, text encoding and MIME parsing.

use std::str::FromStr;

use super::{read_bytes, unexpected_payload, TransformOptions, Transformer};
use crate::compression::{CompressionAdapter, GzipCompressor, ZlibCompressor};
use crate::message::MimeMessage;
use crate::resource::{Payload, Resource};
use crate::{Result, UssrError};

/// Compresses a payload's raw bytes with the wrapped compression adapter
///
/// Only bytes payloads are accepted; put a [`TextEncoder`] step in front of
/// text so the chain's inverse gives the text back.
#[derive(Debug, Clone)]
pub struct Compress<C: CompressionAdapter> {
    compressor: C,
}

impl<C: CompressionAdapter> Compress<C> {
    pub fn new(compressor: C) -> Self {
        Self { compressor }
    }

    pub fn compressor(&self) -> &C {
        &self.compressor
    }
}

impl Compress<ZlibCompressor> {
    /// Zlib compression, registered as `zlib.bin`
    pub fn zlib(level: u32) -> Self {
        Self::new(ZlibCompressor::with_level(level))
    }
}

impl Compress<GzipCompressor> {
    /// Gzip compression, registered as `gz`
    pub fn gzip(level: u32) -> Self {
        Self::new(GzipCompressor::with_level(level))
    }
}

impl<C: CompressionAdapter> Transformer for Compress<C> {
    fn content_type(&self) -> &str {
        self.compressor.content_type()
    }

    fn transform(&self, resource: &mut Resource, _options: &TransformOptions) -> Result<()> {
        let data = read_bytes(resource, self.compressor.content_type())?;
        let compressed = self.compressor.compress(data)?;
        resource.payload = Payload::Bytes(compressed);
        Ok(())
    }

    fn inverse(&self, resource: &mut Resource, _options: &TransformOptions) -> Result<()> {
        let format = self.compressor.content_type();
        let Payload::Bytes(data) = &resource.payload else {
            return Err(unexpected_payload(format, "bytes", &resource.payload));
        };
        let decompressed = self
            .compressor
            .decompress(data)
            .map_err(|e| UssrError::decode(format, e))?;
        resource.payload = Payload::Bytes(decompressed);
        Ok(())
    }
}

/// Character encodings understood by [`TextEncoder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Ascii,
    Latin1,
}

impl TextEncoding {
    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Ascii => "ascii",
            TextEncoding::Latin1 => "latin-1",
        }
    }

    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        match self {
            TextEncoding::Utf8 => Ok(text.as_bytes().to_vec()),
            TextEncoding::Ascii | TextEncoding::Latin1 => {
                let limit = if *self == TextEncoding::Ascii { 0x7f } else { 0xff };
                text.chars()
                    .map(|c| {
                        u8::try_from(u32::from(c))
                            .ok()
                            .filter(|byte| u32::from(*byte) <= limit)
                            .ok_or_else(|| {
                                UssrError::decode(
                                    "text",
                                    format!("character {c:?} cannot be encoded as {}", self.label()),
                                )
                            })
                    })
                    .collect()
            }
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        match self {
            TextEncoding::Utf8 => {
                String::from_utf8(bytes.to_vec()).map_err(|e| UssrError::decode("bytes", e))
            }
            TextEncoding::Ascii => match bytes.iter().position(|byte| !byte.is_ascii()) {
                Some(offset) => Err(UssrError::decode(
                    "bytes",
                    format!("non-ascii byte at offset {offset}"),
                )),
                None => Ok(bytes.iter().map(|byte| char::from(*byte)).collect()),
            },
            TextEncoding::Latin1 => Ok(bytes.iter().map(|byte| char::from(*byte)).collect()),
        }
    }
}

impl FromStr for TextEncoding {
    type Err = UssrError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "ascii" | "us-ascii" => Ok(TextEncoding::Ascii),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(TextEncoding::Latin1),
            other => Err(UssrError::validation(format!(
                "Unsupported text encoding: {other}"
            ))),
        }
    }
}

/// Encodes a text payload to bytes using the resource's `encoding`
#[derive(Debug, Clone, Copy, Default)]
pub struct TextEncoder;

impl TextEncoder {
    fn encoding(resource: &Resource) -> Result<TextEncoding> {
        resource
            .encoding
            .as_deref()
            .map_or(Ok(TextEncoding::default()), str::parse)
    }
}

impl Transformer for TextEncoder {
    fn content_type(&self) -> &str {
        "bytes"
    }

    fn source_type(&self) -> Option<&str> {
        Some("text")
    }

    fn transform(&self, resource: &mut Resource, _options: &TransformOptions) -> Result<()> {
        let encoding = Self::encoding(resource)?;
        let Payload::Text(text) = &resource.payload else {
            return Err(unexpected_payload("text", "text", &resource.payload));
        };
        let bytes = encoding.encode(text)?;
        resource.payload = Payload::Bytes(bytes);
        Ok(())
    }

    fn inverse(&self, resource: &mut Resource, _options: &TransformOptions) -> Result<()> {
        let encoding = Self::encoding(resource)?;
        let Payload::Bytes(bytes) = &resource.payload else {
            return Err(unexpected_payload("bytes", "bytes", &resource.payload));
        };
        let text = encoding.decode(bytes)?;
        resource.payload = Payload::Text(text);
        Ok(())
    }
}

/// Parses raw bytes into a structured MIME message
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageParser;

impl Transformer for MessageParser {
    fn content_type(&self) -> &str {
        "message"
    }

    fn transform(&self, resource: &mut Resource, _options: &TransformOptions) -> Result<()> {
        let raw = read_bytes(resource, "message")?;
        let message = MimeMessage::parse(raw)?;
        resource.payload = Payload::Message(message);
        Ok(())
    }

    fn inverse(&self, resource: &mut Resource, _options: &TransformOptions) -> Result<()> {
        match std::mem::take(&mut resource.payload) {
            Payload::Message(message) => {
                resource.payload = Payload::Bytes(message.into_bytes());
                Ok(())
            }
            other => {
                let error = unexpected_payload("message", "message", &other);
                resource.payload = other;
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::LocationKind;
    use crate::transform::compose;

    fn resource_with(payload: impl Into<Payload>) -> Resource {
        Resource::new("blob", "", LocationKind::Memory).with_payload(payload)
    }

    #[test]
    fn test_compress_roundtrip_restores_bytes() {
        let original = b"sensor,value\n".repeat(50);
        let mut resource = resource_with(original.clone());
        let zlib = Compress::zlib(6);

        zlib.transform(&mut resource, &TransformOptions::default()).unwrap();
        assert_ne!(resource.payload, Payload::Bytes(original.clone()));
        assert!(resource.payload.len() < original.len());

        zlib.inverse(&mut resource, &TransformOptions::default()).unwrap();
        assert_eq!(resource.payload, Payload::Bytes(original));
    }

    #[test]
    fn test_compress_rejects_text_payload() {
        let mut resource = resource_with("age: 30\n");
        let result = Compress::gzip(6).transform(&mut resource, &TransformOptions::default());

        match result.unwrap_err() {
            UssrError::Decode { format, message } => {
                assert_eq!(format, "gz");
                assert!(message.contains("found text"));
            }
            other => panic!("Expected decode error, got {other:?}"),
        }
        assert_eq!(resource.payload, Payload::Text("age: 30\n".to_string()));
    }

    #[test]
    fn test_encoded_text_compresses_and_comes_back_as_text() {
        let chain = compose(vec![Box::new(TextEncoder), Box::new(Compress::zlib(6))]);
        let mut resource = resource_with("age: 30\n");
        let original = resource.clone();

        chain.transform(&mut resource, &TransformOptions::default()).unwrap();
        assert!(matches!(resource.payload, Payload::Bytes(_)));

        chain.inverse(&mut resource, &TransformOptions::default()).unwrap();
        assert_eq!(resource, original);
    }

    #[test]
    fn test_message_parser_rejects_text_payload() {
        let mut resource = resource_with("Subject: hi\r\n\r\nbody\r\n");
        let result = MessageParser.transform(&mut resource, &TransformOptions::default());
        assert!(result.unwrap_err().is_decode());
    }

    #[test]
    fn test_compress_keys() {
        assert_eq!(Compress::zlib(6).content_type(), "zlib.bin");
        assert_eq!(Compress::gzip(6).content_type(), "gz");
        assert_eq!(Compress::zlib(6).source_type(), None);
    }

    #[test]
    fn test_decompress_garbage_is_decode_error() {
        let mut resource = resource_with(b"definitely not zlib".to_vec());
        let result = Compress::zlib(6).inverse(&mut resource, &TransformOptions::default());

        match result.unwrap_err() {
            UssrError::Decode { format, .. } => assert_eq!(format, "zlib.bin"),
            other => panic!("Expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_text_encoder_roundtrip() {
        let mut resource = resource_with("température");

        TextEncoder
            .transform(&mut resource, &TransformOptions::default())
            .unwrap();
        assert_eq!(resource.payload, Payload::Bytes("température".as_bytes().to_vec()));

        TextEncoder
            .inverse(&mut resource, &TransformOptions::default())
            .unwrap();
        assert_eq!(resource.payload, Payload::Text("température".to_string()));
    }

    #[test]
    fn test_text_encoder_latin1() {
        let mut resource = resource_with("café").with_encoding("ISO-8859-1");

        TextEncoder
            .transform(&mut resource, &TransformOptions::default())
            .unwrap();
        assert_eq!(resource.payload, Payload::Bytes(vec![b'c', b'a', b'f', 0xe9]));

        TextEncoder
            .inverse(&mut resource, &TransformOptions::default())
            .unwrap();
        assert_eq!(resource.payload, Payload::Text("café".to_string()));
    }

    #[test]
    fn test_ascii_rejects_wide_characters() {
        let mut resource = resource_with("naïve").with_encoding("ascii");
        let result = TextEncoder.transform(&mut resource, &TransformOptions::default());
        assert!(result.unwrap_err().is_decode());
        assert_eq!(resource.payload, Payload::Text("naïve".to_string()));
    }

    #[test]
    fn test_invalid_utf8_is_decode_error() {
        let mut resource = resource_with(vec![0xc3, 0x28]);
        let result = TextEncoder.inverse(&mut resource, &TransformOptions::default());
        assert!(result.unwrap_err().is_decode());
    }

    #[test]
    fn test_unknown_encoding_is_rejected() {
        let mut resource = resource_with("x").with_encoding("ebcdic");
        let result = TextEncoder.transform(&mut resource, &TransformOptions::default());
        assert!(matches!(result.unwrap_err(), UssrError::Validation(_)));
    }

    #[test]
    fn test_message_parser_roundtrip() {
        let raw = b"Subject: sample run\r\nContent-Type: text/plain\r\n\r\nall nominal\r\n".to_vec();
        let mut resource = resource_with(raw.clone());

        MessageParser
            .transform(&mut resource, &TransformOptions::default())
            .unwrap();
        match &resource.payload {
            Payload::Message(message) => assert_eq!(message.subject(), Some("sample run")),
            other => panic!("Expected message payload, got {}", other.kind()),
        }

        MessageParser
            .inverse(&mut resource, &TransformOptions::default())
            .unwrap();
        assert_eq!(resource.payload, Payload::Bytes(raw));
    }

    #[test]
    fn test_message_inverse_requires_message() {
        let mut resource = resource_with(b"raw".to_vec());
        let result = MessageParser.inverse(&mut resource, &TransformOptions::default());

        assert!(result.unwrap_err().is_decode());
        assert_eq!(resource.payload, Payload::Bytes(b"raw".to_vec()));
    }
}
