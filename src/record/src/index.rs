use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter};

use cyber_record_storage::ByteCursor;
use cyber_record_utils::time::unix_nano_format;
use protobuf::Message;
use tracing::{debug, warn};

use crate::block::BlockAccessor;
use crate::error::{RecordError, Result};
use crate::proto::record::{
    Channel, ChannelCache, ChunkBody, ChunkHeader, Index, SectionType as WireType,
};
use crate::section::{Section, SectionType, FIRST_CHUNK_OFFSET, SECTION_LENGTH};

/// ChunkHeaderIndexEntry locates a chunk header section and the time span of
/// the messages in the chunk behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkHeaderIndexEntry {
    /// The min and max message time in the chunk, both inclusive.
    pub begin_time: u64,
    pub end_time: u64,

    /// The absolute position of the chunk header section.
    pub position: u64,

    pub message_number: u64,
}

impl ChunkHeaderIndexEntry {
    /// overlaps_time_range returns true if the chunk may hold messages in
    /// `[start_time, end_time]`. Both bounds are inclusive.
    pub fn overlaps_time_range(&self, start_time: u64, end_time: u64) -> bool {
        !(self.end_time < start_time || self.begin_time > end_time)
    }
}

impl Display for ChunkHeaderIndexEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "begin={} end={} pos={} messages={}",
            unix_nano_format(self.begin_time),
            unix_nano_format(self.end_time),
            self.position,
            self.message_number,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkBodyIndexEntry {
    /// The absolute position of the chunk body section.
    pub position: u64,
    pub message_number: u64,
}

/// ChannelMetadata describes one channel and carries its embedded schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMetadata {
    pub name: String,
    /// Full protobuf name of the message type, e.g. `apollo.localization.Pose`.
    pub message_type: String,
    /// Serialized `ProtoDesc`: the type's file descriptor and its dependencies.
    pub proto_desc: Vec<u8>,
    pub message_number: u64,
}

impl From<&ChannelCache> for ChannelMetadata {
    fn from(c: &ChannelCache) -> Self {
        Self {
            name: c.name().to_string(),
            message_type: c.message_type().to_string(),
            proto_desc: c.proto_desc().to_vec(),
            message_number: c.message_number(),
        }
    }
}

impl From<Channel> for ChannelMetadata {
    fn from(mut c: Channel) -> Self {
        Self {
            name: c.take_name(),
            message_type: c.take_message_type(),
            proto_desc: c.take_proto_desc(),
            message_number: 0,
        }
    }
}

/// ChunkIndex is the catalog of chunks and channels of one record file. It is
/// built once when the file is opened and never changes afterwards.
#[derive(Debug, Default, Clone)]
pub struct ChunkIndex {
    /// Sorted by `begin_time`.
    chunk_headers: Vec<ChunkHeaderIndexEntry>,
    chunk_bodies: Vec<ChunkBodyIndexEntry>,
    channels: BTreeMap<String, ChannelMetadata>,
}

impl ChunkIndex {
    /// from_index classifies the entries of the index block.
    pub fn from_index(index: &Index) -> Self {
        let mut ci = Self::default();

        for single_index in &index.indexes {
            let typ = single_index.type_.map(|t| t.enum_value());
            match typ {
                Some(Ok(WireType::SECTION_CHUNK_HEADER)) => {
                    let cache = single_index.chunk_header_cache();
                    ci.chunk_headers.push(ChunkHeaderIndexEntry {
                        begin_time: cache.begin_time(),
                        end_time: cache.end_time(),
                        position: single_index.position(),
                        message_number: cache.message_number(),
                    });
                }
                Some(Ok(WireType::SECTION_CHUNK_BODY)) => {
                    ci.chunk_bodies.push(ChunkBodyIndexEntry {
                        position: single_index.position(),
                        message_number: single_index.chunk_body_cache().message_number(),
                    });
                }
                Some(Ok(WireType::SECTION_CHANNEL)) => {
                    ci.insert_channel(ChannelMetadata::from(single_index.channel_cache()));
                }
                other => {
                    warn!(
                        "unknown index entry type {:?} at position {}, skipped",
                        other,
                        single_index.position()
                    );
                }
            }
        }

        ci.sort();
        ci
    }

    /// rebuild reconstructs the catalog by walking every section after the
    /// header region. It is the fallback for files whose index block is
    /// missing, typically because the producer never finished writing them.
    ///
    /// A truncated tail ends the walk; the chunk it belongs to is dropped.
    pub fn rebuild<R: ByteCursor>(r: &mut R, accessor: &BlockAccessor) -> Result<Self> {
        let mut ci = Self::default();
        let mut pending_header: Option<ChunkHeaderIndexEntry> = None;
        let mut position = FIRST_CHUNK_OFFSET;
        // channel sections carry no message count
        let mut message_numbers: HashMap<String, u64> = HashMap::new();

        while position + SECTION_LENGTH <= accessor.max_offset() {
            r.seek_to(position)?;
            let section = Section::read_from(r)?;

            let payload = match accessor.read_payload(r, &section) {
                Ok(payload) => payload,
                Err(e) if e.is_truncated() => {
                    warn!("record ends inside a {} at offset {}", section, position);
                    break;
                }
                Err(e) => return Err(e),
            };

            match section.kind() {
                Some(SectionType::ChunkHeader) => {
                    let header = ChunkHeader::parse_from_bytes(payload.as_slice())
                        .map_err(|e| RecordError::decode("chunk header", e))?;
                    pending_header = Some(ChunkHeaderIndexEntry {
                        begin_time: header.begin_time(),
                        end_time: header.end_time(),
                        position,
                        message_number: header.message_number(),
                    });
                }
                Some(SectionType::ChunkBody) => match pending_header.take() {
                    Some(header) => {
                        let body = ChunkBody::parse_from_bytes(payload.as_slice())
                            .map_err(|e| RecordError::decode("chunk body", e))?;
                        for m in &body.messages {
                            *message_numbers
                                .entry(m.channel_name().to_string())
                                .or_insert(0) += 1;
                        }

                        ci.chunk_bodies.push(ChunkBodyIndexEntry {
                            position,
                            message_number: body.messages.len() as u64,
                        });
                        ci.chunk_headers.push(header);
                    }
                    None => warn!("chunk body at offset {} without a chunk header", position),
                },
                Some(SectionType::Channel) => {
                    let channel = Channel::parse_from_bytes(payload.as_slice())
                        .map_err(|e| RecordError::decode("channel", e))?;
                    ci.insert_channel(ChannelMetadata::from(channel));
                }
                Some(SectionType::Header) | Some(SectionType::Index) => {
                    debug!("rebuild: skip {} at offset {}", section, position);
                }
                None => warn!("rebuild: unknown {} at offset {}", section, position),
            }

            position += SECTION_LENGTH + section.size;
        }

        for (name, n) in message_numbers {
            if let Some(channel) = ci.channels.get_mut(&name) {
                channel.message_number = n;
            }
        }

        ci.sort();
        Ok(ci)
    }

    fn insert_channel(&mut self, channel: ChannelMetadata) {
        if let Some(previous) = self.channels.insert(channel.name.clone(), channel) {
            debug!("channel {} registered twice, keeping the last one", previous.name);
        }
    }

    fn sort(&mut self) {
        self.chunk_headers.sort_by_key(|x| x.begin_time);
    }

    pub fn chunk_headers(&self) -> &[ChunkHeaderIndexEntry] {
        &self.chunk_headers
    }

    pub fn chunk_bodies(&self) -> &[ChunkBodyIndexEntry] {
        &self.chunk_bodies
    }

    pub fn channels(&self) -> impl Iterator<Item = &ChannelMetadata> {
        self.channels.values()
    }

    pub fn channel(&self, name: &str) -> Option<&ChannelMetadata> {
        self.channels.get(name)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// next_in_range returns the position of the first chunk header at or
    /// after `from` that overlaps `[start_time, end_time]`.
    pub fn next_in_range(&self, from: usize, start_time: u64, end_time: u64) -> Option<usize> {
        for (i, entry) in self.chunk_headers.iter().enumerate().skip(from) {
            // sorted by begin_time: nothing after this one can overlap
            if entry.begin_time > end_time {
                return None;
            }
            if entry.overlaps_time_range(start_time, end_time) {
                return Some(i);
            }
        }
        None
    }

    /// chunks_in_range returns the positions, in sorted order, of all chunk
    /// headers overlapping `[start_time, end_time]`.
    pub fn chunks_in_range(&self, start_time: u64, end_time: u64) -> Vec<usize> {
        let mut selected = Vec::new();
        let mut from = 0;
        while let Some(i) = self.next_in_range(from, start_time, end_time) {
            selected.push(i);
            from = i + 1;
        }
        selected
    }
}
