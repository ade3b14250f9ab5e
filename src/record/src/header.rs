use std::fmt::{Display, Formatter};

use cyber_record_utils::time::unix_nano_format;

use crate::proto::record::{CompressType, Header};

/// RecordHeader holds the file level metadata written by the producer.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordHeader {
    pub major_version: u32,
    pub minor_version: u32,
    pub compress: CompressType,
    pub chunk_interval: u64,
    pub segment_interval: u64,
    /// Offset of the index section.
    pub index_position: u64,
    pub chunk_number: u64,
    pub channel_number: u64,
    pub begin_time: u64,
    pub end_time: u64,
    pub message_number: u64,
    /// Total size of the file in bytes.
    pub size: u64,
    /// false while the producer is still appending; the index may be missing.
    pub is_complete: bool,
    pub chunk_raw_size: u64,
    pub segment_raw_size: u64,
}

impl RecordHeader {
    pub fn version(&self) -> String {
        format!("{}.{}", self.major_version, self.minor_version)
    }
}

impl Default for RecordHeader {
    fn default() -> Self {
        Self::from(Header::new())
    }
}

impl From<Header> for RecordHeader {
    fn from(h: Header) -> Self {
        Self {
            major_version: h.major_version(),
            minor_version: h.minor_version(),
            compress: h.compress(),
            chunk_interval: h.chunk_interval(),
            segment_interval: h.segment_interval(),
            index_position: h.index_position(),
            chunk_number: h.chunk_number(),
            channel_number: h.channel_number(),
            begin_time: h.begin_time(),
            end_time: h.end_time(),
            message_number: h.message_number(),
            size: h.size(),
            is_complete: h.is_complete(),
            chunk_raw_size: h.chunk_raw_size(),
            segment_raw_size: h.segment_raw_size(),
        }
    }
}

impl Display for RecordHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "version={} size={} messages={} chunks={} channels={} begin={} end={} complete={}",
            self.version(),
            self.size,
            self.message_number,
            self.chunk_number,
            self.channel_number,
            unix_nano_format(self.begin_time),
            unix_nano_format(self.end_time),
            self.is_complete,
        )
    }
}
