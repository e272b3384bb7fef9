/*!
The resource record: a named payload plus where it lives and what format it is in.
*/

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::message::MimeMessage;
use crate::{Result, UssrError};

/// Where a resource lives, which selects the handler used to save or load it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    /// Payload only exists in this process
    Memory,
    /// A directory on the local filesystem
    Filesystem,
    /// A remote resource fetched over HTTP
    Url,
}

impl LocationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationKind::Memory => "memory",
            LocationKind::Filesystem => "filesystem",
            LocationKind::Url => "url",
        }
    }
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocationKind {
    type Err = UssrError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mem" | "memory" => Ok(LocationKind::Memory),
            "fs" | "filesystem" => Ok(LocationKind::Filesystem),
            "url" => Ok(LocationKind::Url),
            other => Err(UssrError::validation(format!(
                "Unknown location kind: {other}"
            ))),
        }
    }
}

/// The content held by a resource.
///
/// Which variant is present is a convention of the last transformer applied;
/// the record itself places no constraint on it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    #[default]
    Empty,
    Bytes(Vec<u8>),
    Text(String),
    Message(MimeMessage),
}

impl Payload {
    /// Short name of the representation, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Empty => "empty",
            Payload::Bytes(_) => "bytes",
            Payload::Text(_) => "text",
            Payload::Message(_) => "message",
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    /// Raw bytes for byte-like payloads (bytes, UTF-8 text, a message's wire form)
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Payload::Empty => None,
            Payload::Bytes(bytes) => Some(bytes),
            Payload::Text(text) => Some(text.as_bytes()),
            Payload::Message(message) => Some(message.raw()),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().map_or(0, <[u8]>::len)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Payload::Bytes(bytes.to_vec())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<MimeMessage> for Payload {
    fn from(message: MimeMessage) -> Self {
        Payload::Message(message)
    }
}

/// A content-type tag as recorded before a forward transformation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentTag {
    pub content_type: Option<String>,
    pub extension: Option<String>,
}

/// A named payload with location and content-type metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// Resource name, used as the file stem when persisted
    pub name: String,
    /// Directory, URL or arbitrary label depending on `location_kind`
    pub location: String,
    pub location_kind: LocationKind,
    pub content_type: Option<String>,
    pub extension: Option<String>,
    /// Text encoding used by the text encoder (`utf-8` when unset)
    pub encoding: Option<String>,
    pub payload: Payload,
    lineage: Vec<ContentTag>,
}

impl Resource {
    /// Create a new resource with an empty payload
    ///
    /// # Example
    /// ```rust
    /// use ussr_core::{LocationKind, Resource};
    ///
    /// let resource = Resource::new("my_resource", "example", LocationKind::Filesystem)
    ///     .with_content_type("json")
    ///     .with_payload(br#"{"key":"value"}"#.to_vec());
    /// assert_eq!(resource.extension.as_deref(), Some("json"));
    /// ```
    pub fn new<N, L>(name: N, location: L, location_kind: LocationKind) -> Self
    where
        N: Into<String>,
        L: Into<String>,
    {
        Self {
            name: name.into(),
            location: location.into(),
            location_kind,
            content_type: None,
            extension: None,
            encoding: None,
            payload: Payload::Empty,
            lineage: Vec::new(),
        }
    }

    /// Create an in-memory resource holding the given payload
    pub fn in_memory<N: Into<String>, P: Into<Payload>>(name: N, payload: P) -> Self {
        Self::new(name, "", LocationKind::Memory).with_payload(payload)
    }

    /// Set the content type; the extension follows it unless already set
    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        let content_type = content_type.into();
        if self.extension.is_none() {
            self.extension = Some(content_type.clone());
        }
        self.content_type = Some(content_type);
        self
    }

    pub fn with_extension<S: Into<String>>(mut self, extension: S) -> Self {
        self.extension = Some(extension.into());
        self
    }

    pub fn with_encoding<S: Into<String>>(mut self, encoding: S) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn with_payload<P: Into<Payload>>(mut self, payload: P) -> Self {
        self.payload = payload.into();
        self
    }

    /// Build a filesystem resource from an existing file
    ///
    /// The location is the file's parent directory. The extension is the
    /// last suffix of the file name, or a compound key such as `zlib.bin`
    /// when the name ends with one; the name is what precedes it. The
    /// content type is derived from the extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                UssrError::validation(format!("Path has no file name: {}", path.display()))
            })?;
        let location = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_string_lossy().into_owned(),
            _ => ".".to_string(),
        };
        let payload = fs::read(path)?;

        let (name, extension) = split_file_name(&file_name);
        let mut resource =
            Resource::new(name, location, LocationKind::Filesystem).with_payload(payload);
        if let Some(extension) = extension {
            resource.content_type = Some(content_key(extension).to_string());
            resource.extension = Some(extension.to_string());
        }
        Ok(resource)
    }

    /// File name used when the resource is persisted: `{name}.{extension}`
    ///
    /// Falls back to the content type when no extension is set, and to the
    /// bare name when neither is.
    pub fn file_name(&self) -> String {
        match self.extension.as_deref().or(self.content_type.as_deref()) {
            Some(suffix) if !suffix.is_empty() => format!("{}.{}", self.name, suffix),
            _ => self.name.clone(),
        }
    }

    /// Full path of the persisted resource: `{location}/{name}.{extension}`
    pub fn path(&self) -> PathBuf {
        Path::new(&self.location).join(self.file_name())
    }

    /// SHA-256 hex digest of the payload bytes
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        if let Some(bytes) = self.payload.as_bytes() {
            hasher.update(bytes);
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn tag(&self) -> ContentTag {
        ContentTag {
            content_type: self.content_type.clone(),
            extension: self.extension.clone(),
        }
    }

    /// Content tags recorded by forward transformations, oldest first
    pub fn lineage(&self) -> &[ContentTag] {
        &self.lineage
    }

    /// Record the current tag and retag the resource as `key`
    pub(crate) fn push_tag(&mut self, key: &str) {
        self.lineage.push(self.tag());
        self.content_type = Some(key.to_string());
        self.extension = Some(key.to_string());
    }

    /// Restore the most recently recorded tag, if any
    pub(crate) fn pop_tag(&mut self) -> bool {
        match self.lineage.pop() {
            Some(tag) => {
                self.content_type = tag.content_type;
                self.extension = tag.extension;
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_tag(&mut self, key: &str) {
        self.content_type = Some(key.to_string());
        self.extension = Some(key.to_string());
    }

    pub(crate) fn clear_tag(&mut self) {
        self.content_type = None;
        self.extension = None;
    }

    pub(crate) fn clear_lineage(&mut self) {
        self.lineage.clear();
    }

    /// Move the last suffix of the name into the tag: `data.json` becomes
    /// name `data` tagged `json`
    pub(crate) fn unwrap_name_suffix(&mut self) -> bool {
        match self.name.rsplit_once('.') {
            Some((stem, suffix)) if !stem.is_empty() && !suffix.is_empty() => {
                let (stem, suffix) = (stem.to_string(), suffix.to_string());
                self.content_type = Some(content_key(&suffix).to_string());
                self.extension = Some(suffix);
                self.name = stem;
                true
            }
            _ => false,
        }
    }
}

/// Registry keys that span two file suffixes
const COMPOUND_EXTENSIONS: &[&str] = &["zlib.bin", "csv.json"];

/// Split a file name into resource name and extension
fn split_file_name(file_name: &str) -> (&str, Option<&str>) {
    for compound in COMPOUND_EXTENSIONS {
        if let Some(stem) = file_name
            .strip_suffix(compound)
            .and_then(|rest| rest.strip_suffix('.'))
        {
            if !stem.is_empty() {
                return (stem, Some(*compound));
            }
        }
    }
    match file_name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() && !extension.is_empty() => {
            (stem, Some(extension))
        }
        _ => (file_name, None),
    }
}

/// Normalise a file extension or MIME type into the registry key for it
pub fn content_key(content_type: &str) -> &str {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim();
    match essence {
        "yml" | "application/yaml" | "application/x-yaml" | "text/yaml" | "text/x-yaml" => "yaml",
        "application/json" | "text/json" => "json",
        "text/csv" => "csv",
        "text/plain" | "txt" => "text",
        "message/rfc822" | "eml" => "message",
        "application/zlib" => "zlib.bin",
        "application/gzip" | "application/x-gzip" | "gzip" => "gz",
        "application/octet-stream" => "bin",
        other => other,
    }
}
