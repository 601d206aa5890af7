//! Name encoding and message types for the chunkfetch protocol.
//!
//! A resource is addressed by a segmented name under a domain prefix:
//!
//! ```text
//! lci:/ccnx/tutorial/list/chunk=0
//! lci:/ccnx/tutorial/fetch/report.pdf/chunk=12
//! ```
//!
//! [`addressing`] maps between these names and the typed
//! [`Request`](addressing::Request); [`message`] holds the interest and
//! content object types exchanged over a portal.

pub mod addressing;
pub mod constants;
pub mod error;
pub mod message;
pub mod name;

pub use addressing::{Command, CommandMatching, Request};
pub use error::ProtocolError;
pub use message::{ContentObject, Interest, Message};
pub use name::{NameSegment, ResourceName};
