use std::net::SocketAddr;

/// Errors raised by the fixed-size wire buffer while reading or writing a packet
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("End of buffer: position {pos} is outside the 512-byte packet")]
    EndOfBuffer { pos: usize },

    #[error("Limit of {max} compression jumps exceeded")]
    JumpLimitExceeded { max: usize },

    #[error("Label '{label}' exceeds maximum length of 63 bytes")]
    LabelTooLong { label: String },

    #[error("Packet of {len} bytes does not fit in a 512-byte buffer")]
    PacketTooLarge { len: usize },
}

/// Errors that can occur during DNS packet codec operations
#[derive(Debug, thiserror::Error)]
pub enum DnsCodecError {
    #[error("Wire format error: {0}")]
    Buffer(#[from] BufferError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that abort a resolution, or a single branch of one
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Wire format error: {0}")]
    Buffer(#[from] BufferError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timed out waiting for a reply from {server}")]
    Timeout { server: SocketAddr },

    #[error("Name server lookups nested deeper than {depth} levels")]
    RecursionLimit { depth: usize },

    #[error("Followed more than {hops} referrals without an answer")]
    ReferralLimit { hops: usize },

    #[error("Query actor is no longer running")]
    ActorUnavailable,
}
