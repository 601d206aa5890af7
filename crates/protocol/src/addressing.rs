//! Mapping between requests and segmented names.
//!
//! A request name is `<prefix>/<command>[/<target>]`; every chunk request
//! and response adds a trailing CHUNK segment. All functions here are pure.

use serde::{Deserialize, Serialize};

use crate::constants::{COMMAND_FETCH, COMMAND_LIST};
use crate::error::ProtocolError;
use crate::name::{NameSegment, ResourceName};

/// How a received command segment is compared against the known keywords.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandMatching {
    /// Case-insensitive, whole-word comparison.
    #[default]
    Exact,
    /// Case-insensitive, with the expected keyword truncated to the length
    /// of the received one. `"f"` matches `"fetch"`; kept for peers that
    /// rely on abbreviated commands.
    LegacyPrefix,
}

impl CommandMatching {
    /// Returns `true` if `received` selects the `expected` keyword.
    pub fn matches(self, received: &str, expected: &str) -> bool {
        match self {
            CommandMatching::Exact => received.eq_ignore_ascii_case(expected),
            CommandMatching::LegacyPrefix => {
                received.len() <= expected.len()
                    && expected.as_bytes()[..received.len()]
                        .eq_ignore_ascii_case(received.as_bytes())
            }
        }
    }
}

/// A decoded command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    /// List the regular files of the served directory.
    List,
    /// Fetch a single file by name.
    Fetch(String),
}

impl Command {
    /// The keyword written into the command segment.
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::List => COMMAND_LIST,
            Command::Fetch(_) => COMMAND_FETCH,
        }
    }

    /// The target file name, if the command has one.
    pub fn target(&self) -> Option<&str> {
        match self {
            Command::List => None,
            Command::Fetch(target) => Some(target),
        }
    }
}

/// A fully decoded chunk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub command: Command,
    pub chunk_index: u64,
}

impl Request {
    /// Decodes a chunk request name published under `prefix`.
    ///
    /// The list keyword is checked before fetch, so under
    /// [`CommandMatching::LegacyPrefix`] an empty command would select list.
    pub fn decode(
        name: &ResourceName,
        prefix: &ResourceName,
        matching: CommandMatching,
    ) -> Result<Self, ProtocolError> {
        let keyword = decode_command(name, prefix)?;
        let chunk_index = decode_chunk_index(name)?;

        let command = if matching.matches(&keyword, COMMAND_LIST) {
            Command::List
        } else if matching.matches(&keyword, COMMAND_FETCH) {
            // prefix / fetch / target / chunk
            if name.len() < prefix.len() + 3 {
                return Err(ProtocolError::MalformedName(format!(
                    "fetch without a target: {name}"
                )));
            }
            Command::Fetch(decode_target(name)?)
        } else {
            return Err(ProtocolError::UnknownCommand(keyword));
        };

        Ok(Self {
            command,
            chunk_index,
        })
    }

    /// Encodes this request back into a chunk name under `prefix`.
    pub fn encode(&self, prefix: &ResourceName) -> ResourceName {
        append_chunk_index(&encode_request(prefix, &self.command), self.chunk_index)
    }
}

/// Builds the request name for `command`, without a chunk segment.
pub fn encode_request(prefix: &ResourceName, command: &Command) -> ResourceName {
    let name = prefix.with_name(command.keyword());
    match command.target() {
        Some(target) => name.with_name(target),
        None => name,
    }
}

/// Returns the segment immediately after `prefix`.
pub fn decode_command(name: &ResourceName, prefix: &ResourceName) -> Result<String, ProtocolError> {
    if !name.starts_with(prefix) {
        return Err(ProtocolError::MalformedName(format!(
            "{name} is not under {prefix}"
        )));
    }

    match name.get(prefix.len()) {
        Some(NameSegment::Name(command)) => Ok(command.clone()),
        Some(NameSegment::Chunk(_)) => Err(ProtocolError::MalformedName(format!(
            "command segment is a chunk number: {name}"
        ))),
        None => Err(ProtocolError::MalformedName(format!(
            "missing command segment: {name}"
        ))),
    }
}

/// Returns the second-to-last segment, the file name of a fetch.
pub fn decode_target(name: &ResourceName) -> Result<String, ProtocolError> {
    let index = name
        .len()
        .checked_sub(2)
        .ok_or_else(|| ProtocolError::MalformedName(format!("missing target segment: {name}")))?;

    match name.get(index) {
        Some(NameSegment::Name(target)) => Ok(target.clone()),
        _ => Err(ProtocolError::MalformedName(format!(
            "target segment is not a name: {name}"
        ))),
    }
}

/// Returns the value of the trailing CHUNK segment.
pub fn decode_chunk_index(name: &ResourceName) -> Result<u64, ProtocolError> {
    name.last()
        .and_then(NameSegment::as_chunk)
        .ok_or_else(|| ProtocolError::MalformedName(format!("missing chunk segment: {name}")))
}

pub fn append_chunk_index(base: &ResourceName, index: u64) -> ResourceName {
    base.with_chunk(index)
}

/// Strips a trailing CHUNK segment, yielding the resource key.
pub fn base_name(name: &ResourceName) -> ResourceName {
    match name.last() {
        Some(NameSegment::Chunk(_)) => name.parent(),
        _ => name.clone(),
    }
}
