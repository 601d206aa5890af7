/// Name prefix published by the server and used by the client.
pub const DOMAIN_PREFIX: &str = "lci:/ccnx/tutorial";

/// Default chunk payload size in bytes.
///
/// 1200 keeps a content object under a typical 1500-byte MTU, so responses
/// are not IP-fragmented.
pub const DEFAULT_CHUNK_SIZE: usize = 1200;

/// Keyword for fetching a single file.
pub const COMMAND_FETCH: &str = "fetch";

/// Keyword for listing the served directory.
pub const COMMAND_LIST: &str = "list";

/// Default TCP port of the reference transport.
pub const DEFAULT_PORT: u16 = 9695;
