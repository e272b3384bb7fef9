/*!
Parsed MIME messages held as resource payloads.
*/

use mailparse::{parse_mail, ParsedMail};

use crate::{Result, UssrError};

/// A single header as it appeared in the message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeHeader {
    pub name: String,
    pub value: String,
}

/// One part of a MIME message; multipart bodies nest further parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimePart {
    pub headers: Vec<MimeHeader>,
    /// Lower-cased MIME type, `text/plain` when the part declares none
    pub mime_type: String,
    pub charset: String,
    /// Transfer-decoded body of this part
    pub body: Vec<u8>,
    pub parts: Vec<MimePart>,
}

impl MimePart {
    fn from_parsed(mail: &ParsedMail<'_>) -> Result<Self> {
        let headers = mail
            .headers
            .iter()
            .map(|header| MimeHeader {
                name: header.get_key(),
                value: header.get_value(),
            })
            .collect();
        let body = mail
            .get_body_raw()
            .map_err(|e| UssrError::decode("message", e))?;
        let parts = mail
            .subparts
            .iter()
            .map(MimePart::from_parsed)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            headers,
            mime_type: mail.ctype.mimetype.clone(),
            charset: mail.ctype.charset.clone(),
            body,
            parts,
        })
    }

    /// First header with the given name, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(name))
            .map(|header| header.value.as_str())
    }

    pub fn is_multipart(&self) -> bool {
        self.mime_type.starts_with("multipart/")
    }
}

/// A parsed message that keeps its original wire bytes.
///
/// Serialising back returns those bytes unchanged, so parsing and
/// re-serialising is lossless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeMessage {
    root: MimePart,
    raw: Vec<u8>,
}

impl MimeMessage {
    /// Parse raw message bytes
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let parsed = parse_mail(raw).map_err(|e| UssrError::decode("message", e))?;
        let root = MimePart::from_parsed(&parsed)?;
        Ok(Self {
            root,
            raw: raw.to_vec(),
        })
    }

    pub fn root(&self) -> &MimePart {
        &self.root
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.root.header(name)
    }

    pub fn subject(&self) -> Option<&str> {
        self.header("Subject")
    }

    pub fn parts(&self) -> &[MimePart] {
        &self.root.parts
    }

    /// The original wire bytes
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.raw
    }
}
