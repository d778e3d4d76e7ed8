use std::io::{ErrorKind, Write};

use crate::error::{ProtoError, Result};

/// Writes complete wire documents to any `Write` stream.
pub struct DocumentWriter<T> {
    inner: T,
}

impl<T: Write> DocumentWriter<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Write one document and flush (blocking).
    pub fn write_document(&mut self, document: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < document.len() {
            match self.inner.write(&document[offset..]) {
                Ok(0) => return Err(ProtoError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(ProtoError::Io(err)),
            }
        }

        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(ProtoError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::codec::encode_message;
    use crate::reader::DocumentReader;
    use crate::types::{Body, Message};

    #[test]
    fn write_then_read_back() {
        let wire = encode_message(&Message::request(21, Body::CancelTaskReq)).unwrap();

        let mut writer = DocumentWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.write_document(&wire).unwrap();

        let written = writer.into_inner().into_inner();
        let mut reader = DocumentReader::new(Cursor::new(written));
        let document = reader.read_document().unwrap();
        assert_eq!(document.as_ref(), wire.as_slice());
    }

    #[test]
    fn roundtrip_over_pipe() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = DocumentWriter::new(left);
        let mut reader = DocumentReader::new(right);

        let wire = encode_message(&Message::request(1, Body::RtkFusionReq)).unwrap();
        writer.write_document(&wire).unwrap();

        let document = reader.read_document().unwrap();
        let decoded = crate::codec::decode_request(&document).unwrap();
        assert_eq!(decoded.body, Body::RtkFusionReq);
    }
}
