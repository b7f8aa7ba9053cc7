use std::num::NonZeroUsize;

/// Connection count used when none is given.
pub const DEFAULT_CONNECTIONS: NonZeroUsize = match NonZeroUsize::new(100) {
    Some(n) => n,
    None => unreachable!(),
};

/// Implicit checkpoint recorded when a connection opens.
pub const CONNECTION_OPENED: &str = "Connection opened";

/// Implicit checkpoint recorded when a connection closes.
pub const CONNECTION_CLOSED: &str = "Connection closed";
