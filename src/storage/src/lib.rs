use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

pub mod mmap;

/// ByteCursor is the only I/O primitive the record reader relies on: one
/// position, moved by seeks and advanced by exact reads.
pub trait ByteCursor: Read + Seek {
    /// seek_to moves the cursor to an absolute offset from the start of the file.
    fn seek_to(&mut self, position: u64) -> io::Result<u64> {
        self.seek(SeekFrom::Start(position))
    }

    /// tell returns the current absolute offset.
    fn tell(&mut self) -> io::Result<u64> {
        self.stream_position()
    }

    /// skip moves the cursor forward by `n` bytes without reading them.
    fn skip(&mut self, n: u64) -> io::Result<u64> {
        let n = i64::try_from(n).map_err(|_| {
            io::Error::new(ErrorKind::InvalidInput, format!("skip too large: {}", n))
        })?;
        self.seek(SeekFrom::Current(n))
    }

    /// read_exactly reads exactly `n` bytes, failing with `UnexpectedEof` when
    /// the backing file is shorter.
    fn read_exactly(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0_u8; n];
        self.read_exact(buf.as_mut_slice())?;
        Ok(buf)
    }

    /// file_len returns the total length of the backing file and restores the
    /// current position.
    fn file_len(&mut self) -> io::Result<u64> {
        let current = self.stream_position()?;
        let end = self.seek(SeekFrom::End(0))?;
        if current != end {
            self.seek(SeekFrom::Start(current))?;
        }
        Ok(end)
    }
}

impl<T: Read + Seek> ByteCursor for T {}

/// open_buffered opens `path` for sequential reads through a `BufReader`.
pub fn open_buffered(path: impl AsRef<Path>) -> io::Result<BufReader<File>> {
    let f = File::open(path)?;
    Ok(BufReader::new(f))
}
