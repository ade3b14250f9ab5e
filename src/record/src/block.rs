use std::io;

use cyber_record_storage::ByteCursor;
use protobuf::Message;
use tracing::debug;

use crate::error::{RecordError, Result};
use crate::header::RecordHeader;
use crate::proto::record::{ChunkBody, ChunkHeader, Header, Index};
use crate::section::{Section, SectionType, FIRST_CHUNK_OFFSET};

/// BlockAccessor decodes the structural blocks of a record file: a section
/// prologue followed by a protobuf payload of exactly `size` bytes.
///
/// A section of another type than the one asked for is reported as `Ok(None)`
/// so callers can tell a misplaced block from a corrupted one.
#[derive(Debug, Clone, Copy)]
pub struct BlockAccessor {
    /// Total length of the backing file. No payload may run past it.
    max_offset: u64,
}

impl BlockAccessor {
    pub fn new(max_offset: u64) -> Self {
        Self { max_offset }
    }

    pub fn max_offset(&self) -> u64 {
        self.max_offset
    }

    /// read_header decodes the header at offset 0 and leaves the cursor at the
    /// first byte after the reserved header region.
    pub fn read_header<R: ByteCursor>(&self, r: &mut R) -> Result<Option<RecordHeader>> {
        r.seek_to(0)?;
        let header: Option<Header> = self.read_block(r, SectionType::Header)?;
        r.seek_to(FIRST_CHUNK_OFFSET)?;

        Ok(header.map(RecordHeader::from))
    }

    /// read_index decodes the index block located at `header.index_position`.
    pub fn read_index<R: ByteCursor>(
        &self,
        r: &mut R,
        header: &RecordHeader,
    ) -> Result<Option<Index>> {
        r.seek_to(header.index_position)?;
        self.read_block(r, SectionType::Index)
    }

    pub fn read_chunk_header<R: ByteCursor>(
        &self,
        r: &mut R,
        position: u64,
    ) -> Result<Option<ChunkHeader>> {
        r.seek_to(position)?;
        self.read_block(r, SectionType::ChunkHeader)
    }

    pub fn read_chunk_body<R: ByteCursor>(
        &self,
        r: &mut R,
        position: u64,
    ) -> Result<Option<ChunkBody>> {
        r.seek_to(position)?;
        self.read_block(r, SectionType::ChunkBody)
    }

    /// read_block reads the section at the current position and parses its
    /// payload as `M` when the section has the expected type.
    pub(crate) fn read_block<R: ByteCursor, M: Message>(
        &self,
        r: &mut R,
        expected: SectionType,
    ) -> Result<Option<M>> {
        let offset = r.tell()?;
        let section = Section::read_from(r)?;
        if !section.is(expected) {
            debug!(
                "expecting {} section at offset {}, found {}",
                expected.name(),
                offset,
                section
            );
            return Ok(None);
        }

        let data = self.read_payload(r, &section)?;
        let block = M::parse_from_bytes(data.as_slice())
            .map_err(|e| RecordError::decode(expected.name(), e))?;

        Ok(Some(block))
    }

    /// read_payload reads the `section.size` bytes following a prologue.
    pub(crate) fn read_payload<R: ByteCursor>(
        &self,
        r: &mut R,
        section: &Section,
    ) -> Result<Vec<u8>> {
        let offset = r.tell()?;
        let truncated = RecordError::Truncated {
            offset,
            expected: section.size,
        };

        match offset.checked_add(section.size) {
            Some(end) if end <= self.max_offset => {}
            _ => return Err(truncated),
        }

        r.read_exactly(section.size as usize).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                truncated
            } else {
                RecordError::Io(e)
            }
        })
    }
}
