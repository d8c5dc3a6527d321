use crate::messages::message::Message;

/// Non-blocking message pipe to the remote peer.
///
/// Implementations that receive on another thread must queue messages and
/// hand them over here; the session only ever polls from its own thread.
pub trait Transport {
    fn send(&mut self, message: Message);

    /// Next queued message, if any. Never blocks.
    fn try_receive(&mut self) -> Option<Message>;
}
