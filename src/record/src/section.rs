use std::fmt::{Display, Formatter};
use std::io::{self, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use cyber_record_storage::ByteCursor;

use crate::error::{RecordError, Result};

/// Size in bytes of the prologue in front of every section:
/// | type(4B) | reserved(4B) | size(8B) |, all little endian.
pub const SECTION_LENGTH: u64 = 16;

/// Capacity reserved for the header payload at the start of the file.
pub const HEADER_LENGTH: u64 = 2048;

/// Offset of the first section written after the header region.
pub const FIRST_CHUNK_OFFSET: u64 = HEADER_LENGTH + SECTION_LENGTH;

/// SectionType is the kind of structural block a section holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum SectionType {
    Header = 0,
    ChunkHeader = 1,
    ChunkBody = 2,
    Index = 3,
    Channel = 4,
}

impl SectionType {
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::Header),
            1 => Some(Self::ChunkHeader),
            2 => Some(Self::ChunkBody),
            3 => Some(Self::Index),
            4 => Some(Self::Channel),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::ChunkHeader => "chunk header",
            Self::ChunkBody => "chunk body",
            Self::Index => "index",
            Self::Channel => "channel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    /// Raw type tag. Tags unknown to this reader are kept so callers can report them.
    pub typ: u32,
    /// Byte length of the payload following the prologue.
    pub size: u64,
}

impl Section {
    pub fn new(typ: SectionType, size: u64) -> Self {
        Self {
            typ: typ as u32,
            size,
        }
    }

    pub fn kind(&self) -> Option<SectionType> {
        SectionType::from_u32(self.typ)
    }

    pub fn is(&self, typ: SectionType) -> bool {
        self.typ == typ as u32
    }

    /// read_from decodes the prologue at the current cursor position.
    pub fn read_from<R: ByteCursor>(r: &mut R) -> Result<Self> {
        let offset = r.tell()?;
        let truncated = |e: io::Error| -> RecordError {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                RecordError::Truncated {
                    offset,
                    expected: SECTION_LENGTH,
                }
            } else {
                RecordError::Io(e)
            }
        };

        let typ = r.read_u32::<LittleEndian>().map_err(truncated)?;
        // reserved
        r.read_u32::<LittleEndian>().map_err(truncated)?;
        let size = r.read_u64::<LittleEndian>().map_err(truncated)?;

        Ok(Self { typ, size })
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.typ)?;
        w.write_u32::<LittleEndian>(0)?;
        w.write_u64::<LittleEndian>(self.size)?;
        Ok(())
    }
}

impl Display for Section {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind() {
            Some(kind) => write!(f, "section type: {}, size: {}", kind.name(), self.size),
            None => write!(f, "section type: unknown({}), size: {}", self.typ, self.size),
        }
    }
}

/// skip_section reads the prologue at the current position and moves past its payload.
pub fn skip_section<R: ByteCursor>(r: &mut R) -> Result<Section> {
    let section = Section::read_from(r)?;
    r.skip(section.size)?;
    Ok(section)
}
