use std::cmp;
use std::io::{self, Read, Seek};

/// Any seekable byte source.
pub trait ReadSeek: io::Read + io::Seek {}

impl<T: io::Read + io::Seek + ?Sized> ReadSeek for T {}

/// Bounded view over a region of a seekable source.
///
/// Reads never go past the end of the region, whatever the caller asks for,
/// so a box reading its payload cannot consume bytes that belong to its
/// siblings. Positions and seeks are relative to the start of the region.
///
/// A region of a region reads through its parent, which keeps the parent's
/// cursor in step with the child's.
pub struct SubReader<'a> {
    inner: &'a mut dyn ReadSeek,

    // Start of the region in the coordinates of `inner`.
    start: u64,
    length: u64,
    position: u64,

    // Absolute offset of the region start in the outermost source.
    origin: u64,

    // Whether the region runs to the end of the outermost source, so that a
    // box with a length field of 0 may end it.
    open_ended: bool,
}

impl<'a> SubReader<'a> {
    /// Region of `length` bytes starting at the current position of `inner`.
    pub fn new(inner: &'a mut dyn ReadSeek, length: u64) -> io::Result<SubReader<'a>> {
        let start = inner.stream_position()?;
        Ok(SubReader {
            inner,
            start,
            length,
            position: 0,
            origin: start,
            open_ended: false,
        })
    }

    /// Region spanning everything from the current position of `inner` to
    /// its end.
    pub fn to_end(inner: &'a mut dyn ReadSeek) -> io::Result<SubReader<'a>> {
        let start = inner.stream_position()?;
        let end = inner.seek(io::SeekFrom::End(0))?;
        inner.seek(io::SeekFrom::Start(start))?;
        let mut reader = SubReader::new(inner, end.saturating_sub(start))?;
        reader.open_ended = true;
        Ok(reader)
    }

    /// Nested region of `length` bytes starting at the current position.
    ///
    /// The nested region is clipped to what remains of this one.
    pub fn region(&mut self, length: u64) -> io::Result<SubReader<'_>> {
        let start = self.position;
        let length = cmp::min(length, self.remaining());
        let origin = self.origin + start;
        Ok(SubReader {
            inner: self,
            start,
            length,
            position: 0,
            origin,
            open_ended: false,
        })
    }

    /// Nested region over everything that remains of this one, open-ended
    /// when this one is.
    pub fn rest(&mut self) -> io::Result<SubReader<'_>> {
        let open_ended = self.open_ended;
        let mut region = self.region(self.remaining())?;
        region.open_ended = open_ended;
        Ok(region)
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn remaining(&self) -> u64 {
        self.length.saturating_sub(self.position)
    }

    /// Whether the region runs to the end of the source, see
    /// [`SubReader::to_end`] and [`SubReader::rest`].
    pub fn open_ended(&self) -> bool {
        self.open_ended
    }

    /// Absolute offset of the cursor in the outermost source.
    pub fn offset(&self) -> u64 {
        self.origin + self.position
    }
}

impl Read for SubReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.remaining();
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let max = cmp::min(buf.len() as u64, remaining) as usize;
        let read = self.inner.read(&mut buf[..max])?;
        self.position += read as u64;
        Ok(read)
    }
}

impl Seek for SubReader<'_> {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let target = match pos {
            io::SeekFrom::Start(value) => Some(value),
            io::SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
            io::SeekFrom::End(delta) => self.length.checked_add_signed(delta),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )
        })?;

        self.inner.seek(io::SeekFrom::Start(self.start + target))?;
        self.position = target;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read, Seek, SeekFrom};

    #[test]
    fn test_read_is_bounded() {
        let mut cursor = Cursor::new(vec![1u8, 2, 3, 4, 5, 6]);
        cursor.seek(SeekFrom::Start(1)).unwrap();

        let mut reader = SubReader::new(&mut cursor, 3).unwrap();
        let mut data = Vec::new();
        reader.read_to_end(&mut data).unwrap();

        assert_eq!(data, vec![2, 3, 4]);
        assert_eq!(reader.remaining(), 0);
        assert_eq!(reader.offset(), 4);
    }

    #[test]
    fn test_read_exact_past_end_fails() {
        let mut cursor = Cursor::new(vec![1u8, 2, 3, 4]);
        let mut reader = SubReader::new(&mut cursor, 2).unwrap();

        let mut buffer = [0u8; 3];
        let error = reader.read_exact(&mut buffer).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_nested_region_advances_parent() {
        let mut cursor = Cursor::new((0u8..16).collect::<Vec<u8>>());
        let mut reader = SubReader::to_end(&mut cursor).unwrap();
        assert_eq!(reader.length(), 16);

        reader.seek(SeekFrom::Start(4)).unwrap();
        {
            let mut region = reader.region(8).unwrap();
            assert_eq!(region.offset(), 4);

            let mut buffer = [0u8; 2];
            region.read_exact(&mut buffer).unwrap();
            assert_eq!(buffer, [4, 5]);
            assert_eq!(region.offset(), 6);

            // Seeking inside the region is relative to its start.
            region.seek(SeekFrom::End(-1)).unwrap();
            region.read_exact(&mut buffer[..1]).unwrap();
            assert_eq!(buffer[0], 11);
        }
        assert_eq!(reader.position(), 12);
        assert_eq!(reader.remaining(), 4);
    }

    #[test]
    fn test_region_is_clipped() {
        let mut cursor = Cursor::new(vec![0u8; 10]);
        let mut reader = SubReader::to_end(&mut cursor).unwrap();
        reader.seek(SeekFrom::Start(6)).unwrap();

        let region = reader.region(100).unwrap();
        assert_eq!(region.length(), 4);
    }

    #[test]
    fn test_open_ended_regions() {
        let mut cursor = Cursor::new(vec![0u8; 10]);
        assert!(!SubReader::new(&mut cursor, 10).unwrap().open_ended());

        let mut reader = SubReader::to_end(&mut cursor).unwrap();
        assert!(reader.open_ended());
        assert!(!reader.region(4).unwrap().open_ended());

        reader.seek(SeekFrom::Start(2)).unwrap();
        let mut rest = reader.rest().unwrap();
        assert!(rest.open_ended());
        assert_eq!(rest.length(), 8);
        assert!(!rest.region(8).unwrap().open_ended());
    }

    #[test]
    fn test_seek_before_start_fails() {
        let mut cursor = Cursor::new(vec![0u8; 10]);
        let mut reader = SubReader::new(&mut cursor, 10).unwrap();

        assert!(reader.seek(SeekFrom::Current(-1)).is_err());
        assert_eq!(reader.position(), 0);
    }
}
