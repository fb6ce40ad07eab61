//! Shared wire constants for the GorgZorg framed transport

// Version shown by --version; it is never exchanged on the wire
pub const VERSION: &str = "0.1";

pub const DEFAULT_PORT: u16 = 10000;

// Body chunk size used by the sender, in KiB (overridable via --bs)
pub const DEFAULT_CHUNK_KIB: u64 = 4;

// Header paths announcing a directory carry this prefix; the receiver
// strips it before materializing
pub const DIR_TAG: &str = "<^dir$>:";

// Path literal of the end-of-transfer sentinel frame
pub const END_SENTINEL: &str = "<[--Finis_tr@nslationi$--]>";

// Upper bound for the path field of a header frame - prevents memory
// exhaustion from a hostile peer
pub const MAX_PATH_BYTES: usize = 16 * 1024;

// Control reply tokens, written raw on the reverse channel with no framing
pub mod reply {
    pub const OK_SEND: &[u8] = b"Z_OK_SEND";
    pub const KO_SEND: &[u8] = b"Z_KO_SEND";
    pub const OK: &[u8] = b"Z_OK";
}

pub mod timeouts {
    // Connection establishment timeout (ms)
    pub const CONNECT_MS: u64 = 5_000;
}
