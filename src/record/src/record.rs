use std::path::{Path, PathBuf};

use cyber_record_storage::mmap::MmapReadableFile;
use cyber_record_storage::{open_buffered, ByteCursor};
use tracing::info;

use crate::config::ReaderOptions;
use crate::error::Result;
use crate::header::RecordHeader;
use crate::index::ChannelMetadata;
use crate::query::{MessageIterator, TopicFilter};
use crate::reader::RecordReader;

/// RecordSource is the file handle a `Record` reads through.
pub type RecordSource = Box<dyn ByteCursor + Send>;

/// Record is an opened record file. The file handle lives as long as the
/// `Record` and is released when it is dropped.
pub struct Record {
    path: PathBuf,
    reader: RecordReader<RecordSource>,
}

impl Record {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, &ReaderOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: &ReaderOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let source: RecordSource = if options.use_mmap {
            Box::new(MmapReadableFile::open(&path)?)
        } else {
            Box::new(open_buffered(&path)?)
        };
        let reader = RecordReader::open(source, options)?;

        info!(
            "opened record {}: version {}, {} channels, {} chunks{}",
            path.display(),
            reader.header().version(),
            reader.chunk_index().channel_count(),
            reader.chunk_index().chunk_headers().len(),
            if reader.index_rebuilt() {
                " (index rebuilt)"
            } else {
                ""
            }
        );

        Ok(Self { path, reader })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &RecordHeader {
        self.reader.header()
    }

    /// version returns the record format version as `major.minor`.
    pub fn version(&self) -> String {
        self.header().version()
    }

    pub fn size(&self) -> u64 {
        self.header().size
    }

    pub fn message_number(&self) -> u64 {
        self.header().message_number
    }

    pub fn start_time(&self) -> u64 {
        self.header().begin_time
    }

    pub fn end_time(&self) -> u64 {
        self.header().end_time
    }

    pub fn channels(&self) -> impl Iterator<Item = &ChannelMetadata> {
        self.reader.chunk_index().channels()
    }

    pub fn channel_count(&self) -> usize {
        self.reader.chunk_index().channel_count()
    }

    pub fn reader(&self) -> &RecordReader<RecordSource> {
        &self.reader
    }

    pub fn read_messages(
        &mut self,
        topics: TopicFilter,
        start_time: u64,
        end_time: u64,
    ) -> MessageIterator<'_, RecordSource> {
        self.reader.read_messages(topics, start_time, end_time)
    }

    /// read_all streams every message of the record.
    pub fn read_all(&mut self) -> MessageIterator<'_, RecordSource> {
        self.read_messages(TopicFilter::All, 0, u64::MAX)
    }
}
