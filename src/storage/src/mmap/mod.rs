use std::fs::File;
use std::io::{self, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use memmap2::{Mmap, MmapOptions};

/// MmapReadableFile exposes a read-only memory map of a whole file through
/// `Read + Seek`, so it can back a record reader like any other cursor.
pub struct MmapReadableFile {
    len: u64,
    pos: u64,
    // an empty file cannot be mapped
    mmap: Option<Mmap>,
}

impl MmapReadableFile {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let f = File::open(path)?;

        let meta = f.metadata()?;
        let len = meta.len();

        let mmap = if len == 0 {
            None
        } else {
            // The map stays valid as long as no one truncates the file under us;
            // record files are immutable once written.
            Some(unsafe { MmapOptions::new().offset(0).len(len as usize).map(&f)? })
        };

        Ok(Self { len, pos: 0, mmap })
    }

    fn data(&self) -> &[u8] {
        match &self.mmap {
            Some(mmap) => &mmap[..],
            None => &[],
        }
    }
}

impl Read for MmapReadableFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.pos >= self.len {
            return Ok(0);
        }

        let offset = self.pos as usize;
        let size = buf.len().min((self.len - self.pos) as usize);

        buf[..size].copy_from_slice(&self.data()[offset..offset + size]);
        self.pos += size as u64;

        Ok(size)
    }
}

impl Seek for MmapReadableFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::End(n) => self.len.checked_add_signed(n),
            SeekFrom::Current(n) => self.pos.checked_add_signed(n),
        };

        match target {
            Some(n) => {
                self.pos = n;
                Ok(n)
            }
            None => Err(io::Error::new(
                ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}
