//! Reader for cyber record files.
//!
//! A record is a sequence of sections, each a 16 byte prologue followed by a
//! protobuf payload: a header at offset 0, channel and chunk sections, and an
//! index at the end. The reader uses the index to locate chunks by time,
//! resolves every channel's embedded protobuf schema, and streams decoded
//! messages lazily.

pub mod block;
pub mod chunk;
pub mod config;
pub mod error;
pub mod header;
pub mod index;
pub mod proto;
pub mod query;
pub mod reader;
pub mod record;
pub mod schema;
pub mod section;


pub use config::ReaderOptions;
pub use error::{RecordError, Result};
pub use header::RecordHeader;
pub use query::{DecodedMessage, MessageIterator, ReadOutcome, TopicFilter};
pub use reader::RecordReader;
pub use record::Record;
