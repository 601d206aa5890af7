//! Segmented resource names and their text form.
//!
//! # Text form
//!
//! ```text
//! lci:/<segment>/<segment>/.../chunk=<n>
//! ```
//!
//! A NAME segment is written as its percent-encoded value. An explicit
//! `name=` label is accepted on input and used on output for the empty
//! value. A CHUNK segment is written `chunk=<decimal>`. `ccnx:` is accepted
//! as an alternative scheme.

use std::fmt;
use std::str::FromStr;

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Canonical URI scheme.
pub const SCHEME: &str = "lci:";

/// Alternative scheme accepted when parsing.
const LEGACY_SCHEME: &str = "ccnx:";

const CHUNK_LABEL: &str = "chunk";
const NAME_LABEL: &str = "name";

/// Bytes escaped inside a NAME segment value.
const SEGMENT_ESCAPES: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'/')
    .add(b'=')
    .add(b'%')
    .add(b'?')
    .add(b'#');

/// A single typed segment of a [`ResourceName`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NameSegment {
    /// String-valued segment (domain, command, file name).
    Name(String),
    /// Chunk number, always the final segment of a chunk name.
    Chunk(u64),
}

impl NameSegment {
    /// Returns the string value of a NAME segment.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            NameSegment::Name(value) => Some(value),
            NameSegment::Chunk(_) => None,
        }
    }

    /// Returns the number of a CHUNK segment.
    pub fn as_chunk(&self) -> Option<u64> {
        match self {
            NameSegment::Chunk(n) => Some(*n),
            NameSegment::Name(_) => None,
        }
    }
}

impl fmt::Display for NameSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameSegment::Name(value) if value.is_empty() => write!(f, "{NAME_LABEL}="),
            NameSegment::Name(value) => {
                write!(f, "{}", utf8_percent_encode(value, SEGMENT_ESCAPES))
            }
            NameSegment::Chunk(n) => write!(f, "{CHUNK_LABEL}={n}"),
        }
    }
}

impl FromStr for NameSegment {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ProtocolError::InvalidUri("empty segment".into()));
        }

        match s.split_once('=') {
            Some((label, value)) if label.eq_ignore_ascii_case(CHUNK_LABEL) => value
                .parse::<u64>()
                .map(NameSegment::Chunk)
                .map_err(|e| ProtocolError::InvalidUri(format!("bad chunk number {value:?}: {e}"))),
            Some((label, value)) if label.eq_ignore_ascii_case(NAME_LABEL) => {
                decode_value(value).map(NameSegment::Name)
            }
            Some((label, _)) => Err(ProtocolError::InvalidUri(format!(
                "unknown segment label: {label}"
            ))),
            None => decode_value(s).map(NameSegment::Name),
        }
    }
}

fn decode_value(raw: &str) -> Result<String, ProtocolError> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|v| v.into_owned())
        .map_err(|e| ProtocolError::InvalidUri(format!("invalid UTF-8 in segment: {e}")))
}

/// An ordered sequence of typed segments.
///
/// Values are immutable; the `with_*` builders return a new name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceName {
    segments: Vec<NameSegment>,
}

impl ResourceName {
    /// Builds a name from already-typed segments.
    pub fn from_segments(segments: Vec<NameSegment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[NameSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&NameSegment> {
        self.segments.get(index)
    }

    pub fn last(&self) -> Option<&NameSegment> {
        self.segments.last()
    }

    /// Returns `true` if every segment of `prefix` matches the start of `self`.
    pub fn starts_with(&self, prefix: &ResourceName) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Returns a copy of this name with `segment` appended.
    pub fn with_segment(&self, segment: NameSegment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(segment);
        Self { segments }
    }

    /// Returns a copy of this name with a NAME segment appended.
    pub fn with_name(&self, value: impl Into<String>) -> Self {
        self.with_segment(NameSegment::Name(value.into()))
    }

    /// Returns a copy of this name with a CHUNK segment appended.
    pub fn with_chunk(&self, index: u64) -> Self {
        self.with_segment(NameSegment::Chunk(index))
    }

    /// Returns a copy without the final segment (empty names stay empty).
    pub fn parent(&self) -> Self {
        let end = self.segments.len().saturating_sub(1);
        Self {
            segments: self.segments[..end].to_vec(),
        }
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(SCHEME)?;
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for ResourceName {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = strip_scheme(s)
            .ok_or_else(|| ProtocolError::InvalidUri(format!("missing lci: scheme: {s}")))?;

        let path = rest
            .strip_prefix('/')
            .ok_or_else(|| ProtocolError::InvalidUri(format!("name must be absolute: {s}")))?;

        if path.is_empty() {
            return Ok(Self::default());
        }

        let segments = path
            .split('/')
            .map(NameSegment::from_str)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { segments })
    }
}

fn strip_scheme(s: &str) -> Option<&str> {
    [SCHEME, LEGACY_SCHEME].iter().find_map(|scheme| {
        let head = s.get(..scheme.len())?;
        if head.eq_ignore_ascii_case(scheme) {
            Some(&s[scheme.len()..])
        } else {
            None
        }
    })
}

impl TryFrom<String> for ResourceName {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourceName> for String {
    fn from(name: ResourceName) -> Self {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_segments() {
        let name: ResourceName = "lci:/ccnx/tutorial/list".parse().unwrap();
        assert_eq!(name.len(), 3);
        assert_eq!(name.get(2).unwrap().as_name(), Some("list"));
    }

    #[test]
    fn parse_chunk_segment() {
        let name: ResourceName = "lci:/ccnx/tutorial/list/chunk=7".parse().unwrap();
        assert_eq!(name.last(), Some(&NameSegment::Chunk(7)));
        assert_eq!(name.last().unwrap().as_chunk(), Some(7));
    }

    #[test]
    fn parse_explicit_name_label() {
        let name: ResourceName = "lci:/name=ccnx/Name=tutorial".parse().unwrap();
        assert_eq!(
            name.segments(),
            &[
                NameSegment::Name("ccnx".into()),
                NameSegment::Name("tutorial".into())
            ]
        );
    }

    #[test]
    fn accepts_ccnx_scheme() {
        let name: ResourceName = "ccnx:/foo/bar".parse().unwrap();
        assert_eq!(name.to_string(), "lci:/foo/bar");
    }

    #[test]
    fn root_name_is_empty() {
        let name: ResourceName = "lci:/".parse().unwrap();
        assert!(name.is_empty());
        assert_eq!(name.to_string(), "lci:/");
    }

    #[test]
    fn rejects_missing_scheme() {
        assert!(matches!(
            "/ccnx/tutorial".parse::<ResourceName>(),
            Err(ProtocolError::InvalidUri(_))
        ));
    }

    #[test]
    fn rejects_relative_path() {
        assert!("lci:ccnx/tutorial".parse::<ResourceName>().is_err());
    }

    #[test]
    fn rejects_empty_segment() {
        assert!("lci:/ccnx//tutorial".parse::<ResourceName>().is_err());
    }

    #[test]
    fn rejects_unknown_label() {
        assert!("lci:/ccnx/version=3".parse::<ResourceName>().is_err());
    }

    #[test]
    fn rejects_bad_chunk_number() {
        assert!("lci:/ccnx/chunk=-1".parse::<ResourceName>().is_err());
        assert!("lci:/ccnx/chunk=abc".parse::<ResourceName>().is_err());
    }

    #[test]
    fn escapes_reserved_characters() {
        let name = ResourceName::default()
            .with_name("my file=1/2.txt")
            .with_chunk(0);
        let text = name.to_string();
        assert_eq!(text, "lci:/my%20file%3D1%2F2.txt/chunk=0");

        let parsed: ResourceName = text.parse().unwrap();
        assert_eq!(parsed, name);
    }

    #[test]
    fn name_that_looks_like_chunk_stays_a_name() {
        let name = ResourceName::default().with_name("chunk=3");
        let parsed: ResourceName = name.to_string().parse().unwrap();
        assert_eq!(parsed.last(), Some(&NameSegment::Name("chunk=3".into())));
    }

    #[test]
    fn empty_value_uses_explicit_label() {
        let name = ResourceName::default().with_name("");
        assert_eq!(name.to_string(), "lci:/name=");
        let parsed: ResourceName = "lci:/name=".parse().unwrap();
        assert_eq!(parsed, name);
    }

    #[test]
    fn builders_do_not_mutate() {
        let base: ResourceName = "lci:/a".parse().unwrap();
        let extended = base.with_name("b").with_chunk(1);
        assert_eq!(base.len(), 1);
        assert_eq!(extended.len(), 3);
        assert_eq!(extended.parent().to_string(), "lci:/a/b");
    }

    #[test]
    fn starts_with_prefix() {
        let prefix: ResourceName = "lci:/ccnx/tutorial".parse().unwrap();
        let name: ResourceName = "lci:/ccnx/tutorial/list/chunk=0".parse().unwrap();
        let other: ResourceName = "lci:/ccnx/other/list".parse().unwrap();
        assert!(name.starts_with(&prefix));
        assert!(!other.starts_with(&prefix));
    }

    #[test]
    fn serde_uses_text_form() {
        let name: ResourceName = "lci:/ccnx/tutorial/list/chunk=2".parse().unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"lci:/ccnx/tutorial/list/chunk=2\"");
        let back: ResourceName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }
}
