use thiserror::Error;

/// Errors that can occur while turning messages into bytes and back
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Serializer rejected the message
    #[error("Failed to encode message: {0}")]
    Encode(String),

    /// Payload is not a valid message
    #[error("Failed to decode message: {0}")]
    Decode(String),

    /// Payload decoded but left bytes unread
    #[error("Decoded message left {count} trailing bytes")]
    TrailingBytes { count: usize },
}
