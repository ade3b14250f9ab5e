use cyber_record_storage::ByteCursor;
use tracing::{debug, warn};

use crate::block::BlockAccessor;
use crate::config::ReaderOptions;
use crate::error::{RecordError, Result};
use crate::header::RecordHeader;
use crate::index::{ChunkHeaderIndexEntry, ChunkIndex};
use crate::proto::record::ChunkHeader;
use crate::query::{MessageIterator, TopicFilter};
use crate::schema::DecoderMap;
use crate::section::{FIRST_CHUNK_OFFSET, SECTION_LENGTH};

/// RecordReader reads one record file through a byte cursor.
///
/// Opening reads the header and the index, builds the chunk catalog and
/// resolves every channel's schema. After that the reader state is immutable;
/// queries only move the cursor.
pub struct RecordReader<R: ByteCursor> {
    pub(crate) cursor: R,
    pub(crate) accessor: BlockAccessor,
    pub(crate) header: RecordHeader,
    pub(crate) index: ChunkIndex,
    pub(crate) decoders: DecoderMap,
    index_rebuilt: bool,
}

impl<R: ByteCursor> RecordReader<R> {
    pub fn open(mut cursor: R, options: &ReaderOptions) -> Result<Self> {
        let file_len = cursor.file_len()?;
        let accessor = BlockAccessor::new(file_len);

        let header = accessor
            .read_header(&mut cursor)?
            .ok_or(RecordError::MissingSection("header"))?;
        debug!("record header: {}", header);

        // an unfinished record has no index and points at offset 0
        let has_index = header.index_position >= FIRST_CHUNK_OFFSET
            && header
                .index_position
                .checked_add(SECTION_LENGTH)
                .map_or(false, |end| end <= file_len);
        let index_block = if has_index {
            accessor.read_index(&mut cursor, &header)?
        } else {
            None
        };

        let (index, index_rebuilt) = match index_block {
            Some(index_block) => (ChunkIndex::from_index(&index_block), false),
            None if options.rebuild_missing_index => {
                warn!(
                    "index not found at {}, rebuilding from {} bytes of sections",
                    header.index_position, file_len
                );
                (ChunkIndex::rebuild(&mut cursor, &accessor)?, true)
            }
            None => return Err(RecordError::MissingSection("index")),
        };

        let decoders = DecoderMap::build(index.channels())?;
        cursor.seek_to(FIRST_CHUNK_OFFSET)?;

        Ok(Self {
            cursor,
            accessor,
            header,
            index,
            decoders,
            index_rebuilt,
        })
    }

    pub fn header(&self) -> &RecordHeader {
        &self.header
    }

    pub fn chunk_index(&self) -> &ChunkIndex {
        &self.index
    }

    pub fn decoders(&self) -> &DecoderMap {
        &self.decoders
    }

    /// index_rebuilt returns true when the catalog was reconstructed by
    /// scanning the file instead of read from its index block.
    pub fn index_rebuilt(&self) -> bool {
        self.index_rebuilt
    }

    /// read_messages returns a lazy stream of the messages of `topics` in the
    /// chunks overlapping `[start_time, end_time]` (nanoseconds, inclusive).
    ///
    /// Chunks are visited in ascending begin time and messages come out in
    /// the order they were written inside each chunk. Note the time range
    /// selects chunks: messages of an overlapping chunk are not filtered
    /// individually.
    pub fn read_messages(
        &mut self,
        topics: TopicFilter,
        start_time: u64,
        end_time: u64,
    ) -> MessageIterator<'_, R> {
        MessageIterator::new(self, topics, start_time, end_time)
    }

    /// read_chunk_header decodes the full chunk header an index entry points to.
    pub fn read_chunk_header(
        &mut self,
        entry: &ChunkHeaderIndexEntry,
    ) -> Result<Option<ChunkHeader>> {
        self.accessor
            .read_chunk_header(&mut self.cursor, entry.position)
    }

    pub fn into_inner(self) -> R {
        self.cursor
    }
}
