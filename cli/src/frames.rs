use std::io::{self, Read, Write};

use bytes::{Bytes, BytesMut};

/// Reads a stream of frames, each a little-endian `u32` length followed by
/// that many bytes.
pub struct FrameReader<R: Read> {
    reader: R,
}

impl<R: Read> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        FrameReader { reader }
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = io::Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut length_bytes = [0u8; 4];
        match self.reader.read_exact(&mut length_bytes) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return None;
            }
            Err(e) => {
                return Some(Err(e));
            }
        }

        let frame_length = u32::from_le_bytes(length_bytes) as usize;
        let mut buffer = BytesMut::zeroed(frame_length);

        match self.reader.read_exact(&mut buffer) {
            Ok(_) => Some(Ok(buffer.freeze())),
            Err(e) => Some(Err(e)),
        }
    }
}

pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let length = u32::try_from(payload.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame of {} bytes does not fit a u32 length", payload.len()),
        )
    })?;

    writer.write_all(&length.to_le_bytes())?;
    writer.write_all(payload)
}
