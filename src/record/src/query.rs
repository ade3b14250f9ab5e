use std::collections::HashSet;

use common_base::iterator::TryIterator;
use cyber_record_storage::ByteCursor;
use protobuf::MessageDyn;
use tracing::{trace, warn};

use crate::chunk::{Chunk, RawMessage};
use crate::error::{RecordError, Result};
use crate::reader::RecordReader;
use crate::section::skip_section;

/// TopicFilter selects messages by exact channel name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TopicFilter {
    #[default]
    All,
    Only(HashSet<String>),
}

impl TopicFilter {
    pub fn all() -> Self {
        Self::All
    }

    pub fn only<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(topics.into_iter().map(Into::into).collect())
    }

    pub fn accepts(&self, channel_name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(topics) => topics.contains(channel_name),
        }
    }
}

/// DecodedMessage is a message of a channel decoded with the channel's schema.
#[derive(Debug)]
pub struct DecodedMessage {
    pub channel_name: String,
    /// Nanoseconds since the Unix epoch.
    pub timestamp: u64,
    pub value: Box<dyn MessageDyn>,
}

/// ReadOutcome is the result of one step of a query.
#[derive(Debug)]
pub enum ReadOutcome {
    Decoded(DecodedMessage),
    /// The message passed the topic filter but its channel has no decoder.
    Skipped(RawMessage),
}

/// MessageIterator is the lazy result of `RecordReader::read_messages`.
///
/// Every step may seek, read and decode one chunk body; nothing is read
/// ahead. The iterator is fused: after an error it only returns `None`.
pub struct MessageIterator<'a, R: ByteCursor> {
    reader: &'a mut RecordReader<R>,
    topics: TopicFilter,
    start_time: u64,
    end_time: u64,

    /// Position in the sorted chunk headers where the next search begins.
    next_chunk: usize,
    chunk: Chunk,

    skipped: u64,
    failed: bool,
}

impl<'a, R: ByteCursor> MessageIterator<'a, R> {
    pub(crate) fn new(
        reader: &'a mut RecordReader<R>,
        topics: TopicFilter,
        start_time: u64,
        end_time: u64,
    ) -> Self {
        Self {
            reader,
            topics,
            start_time,
            end_time,
            next_chunk: 0,
            chunk: Chunk::new(),
            skipped: 0,
            failed: false,
        }
    }

    /// skipped returns how many messages were dropped so far because their
    /// channel has no decoder.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// next_outcome advances to the next message accepted by the topic filter.
    pub fn next_outcome(&mut self) -> Result<Option<ReadOutcome>> {
        if self.failed {
            return Ok(None);
        }

        match self.advance() {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.failed = true;
                Err(e)
            }
        }
    }

    fn advance(&mut self) -> Result<Option<ReadOutcome>> {
        loop {
            while let Some(raw) = self.chunk.next_message() {
                if !self.topics.accepts(&raw.channel_name) {
                    continue;
                }

                let decoder = match self.reader.decoders.get(&raw.channel_name) {
                    Some(decoder) => decoder,
                    None => {
                        trace!("no decoder for channel {}, message skipped", raw.channel_name);
                        self.skipped += 1;
                        return Ok(Some(ReadOutcome::Skipped(raw)));
                    }
                };

                let value = decoder
                    .decode(raw.payload.as_slice())
                    .map_err(|e| RecordError::decode("message payload", e))?;

                return Ok(Some(ReadOutcome::Decoded(DecodedMessage {
                    channel_name: raw.channel_name,
                    timestamp: raw.timestamp,
                    value,
                })));
            }

            let i = match self.reader.index.next_in_range(
                self.next_chunk,
                self.start_time,
                self.end_time,
            ) {
                Some(i) => i,
                None => return Ok(None),
            };
            self.next_chunk = i + 1;

            let position = self.reader.index.chunk_headers()[i].position;
            self.load_chunk(position)?;
        }
    }

    /// load_chunk skips the chunk header section at `position` and decodes the
    /// chunk body right behind it.
    fn load_chunk(&mut self, position: u64) -> Result<()> {
        let reader = &mut *self.reader;

        reader.cursor.seek_to(position)?;
        skip_section(&mut reader.cursor)?;
        let body_position = reader.cursor.tell()?;

        match reader
            .accessor
            .read_chunk_body(&mut reader.cursor, body_position)?
        {
            Some(body) => self.chunk.load_body(body),
            None => warn!(
                "no chunk body after the chunk header at {}, chunk skipped",
                position
            ),
        }

        Ok(())
    }
}

impl<'a, R: ByteCursor> TryIterator for MessageIterator<'a, R> {
    type Item = DecodedMessage;
    type Error = RecordError;

    fn try_next(&mut self) -> Result<Option<Self::Item>> {
        loop {
            match self.next_outcome()? {
                Some(ReadOutcome::Decoded(message)) => return Ok(Some(message)),
                Some(ReadOutcome::Skipped(_)) => continue,
                None => return Ok(None),
            }
        }
    }
}

impl<'a, R: ByteCursor> Iterator for MessageIterator<'a, R> {
    type Item = Result<DecodedMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        self.try_next().transpose()
    }
}
