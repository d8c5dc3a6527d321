//! Bincode wire format for [`Message`]. Transports are free to use their
//! own encoding; this is the default.

use crate::messages::{error::CodecError, message::Message};

pub fn encode(message: &Message) -> Result<Vec<u8>, CodecError> {
    bincode::serde::encode_to_vec(message, bincode::config::standard())
        .map_err(|err| CodecError::Encode(err.to_string()))
}

pub fn decode(bytes: &[u8]) -> Result<Message, CodecError> {
    let (message, read) =
        bincode::serde::decode_from_slice::<Message, _>(bytes, bincode::config::standard())
            .map_err(|err| CodecError::Decode(err.to_string()))?;
    if read != bytes.len() {
        return Err(CodecError::TrailingBytes {
            count: bytes.len() - read,
        });
    }
    Ok(message)
}
