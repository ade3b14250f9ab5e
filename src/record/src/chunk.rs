use crate::proto::record::{ChunkBody, SingleMessage};

/// RawMessage is one message of a chunk body, still in its wire encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub channel_name: String,
    pub timestamp: u64,
    pub payload: Vec<u8>,
}

impl From<SingleMessage> for RawMessage {
    fn from(mut m: SingleMessage) -> Self {
        Self {
            timestamp: m.time(),
            channel_name: m.take_channel_name(),
            payload: m.take_content(),
        }
    }
}

/// Chunk splits one decoded chunk body into its messages, in the order the
/// producer wrote them. Loading a new body drops whatever was left of the
/// previous one.
#[derive(Default)]
pub struct Chunk {
    messages: std::vec::IntoIter<SingleMessage>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_body(&mut self, body: ChunkBody) {
        self.messages = body.messages.into_iter();
    }

    pub fn has_more(&self) -> bool {
        self.messages.len() > 0
    }

    pub fn remaining(&self) -> usize {
        self.messages.len()
    }

    pub fn next_message(&mut self) -> Option<RawMessage> {
        self.messages.next().map(RawMessage::from)
    }
}
