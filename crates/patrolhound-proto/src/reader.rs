use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};

use crate::codec::{scan_document, DEFAULT_MAX_DOCUMENT};
use crate::error::{ProtoError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;
const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Reads complete wire documents from any `Read` stream.
///
/// Handles partial reads internally; callers always get whole documents.
pub struct DocumentReader<T> {
    inner: T,
    buf: BytesMut,
    max_document: usize,
}

impl<T: Read> DocumentReader<T> {
    /// Create a new reader with the default document size limit.
    pub fn new(inner: T) -> Self {
        Self::with_max_document(inner, DEFAULT_MAX_DOCUMENT)
    }

    /// Create a new reader with an explicit document size limit.
    pub fn with_max_document(inner: T, max_document: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            max_document,
        }
    }

    /// Read the next complete document (blocking).
    ///
    /// Returns `Err(ProtoError::ConnectionClosed)` when EOF is reached.
    pub fn read_document(&mut self) -> Result<Bytes> {
        loop {
            if let Some(document) = scan_document(&mut self.buf, self.max_document)? {
                return Ok(document);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(ProtoError::Io(err)),
            };

            if read == 0 {
                return Err(ProtoError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
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

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::codec::encode_message;
    use crate::types::{Body, Message};

    fn request_wire(seq: u16) -> Vec<u8> {
        encode_message(&Message::request(seq, Body::RealTimeStatusReq)).unwrap()
    }

    #[test]
    fn read_single_document() {
        let wire = request_wire(1);
        let mut reader = DocumentReader::new(Cursor::new(wire.clone()));
        let document = reader.read_document().unwrap();
        assert_eq!(document.as_ref(), wire.as_slice());
    }

    #[test]
    fn read_multiple_documents() {
        let mut wire = request_wire(1);
        wire.extend_from_slice(&request_wire(2));
        wire.extend_from_slice(&request_wire(3));

        let mut reader = DocumentReader::new(Cursor::new(wire));
        for expected in [1u16, 2, 3] {
            let document = reader.read_document().unwrap();
            let decoded = crate::codec::decode_request(&document).unwrap();
            assert_eq!(decoded.seq, expected);
        }
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = DocumentReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_document().unwrap_err();
        assert!(matches!(err, ProtoError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_document() {
        let wire = request_wire(4);
        let truncated = wire[..wire.len() - 10].to_vec();
        let mut reader = DocumentReader::new(Cursor::new(truncated));
        let err = reader.read_document().unwrap_err();
        assert!(matches!(err, ProtoError::ConnectionClosed));
    }

    #[test]
    fn partial_read_handling() {
        let wire = request_wire(5);
        let byte_reader = ByteByByteReader { bytes: wire.clone(), pos: 0 };
        let mut reader = DocumentReader::new(byte_reader);
        let document = reader.read_document().unwrap();
        assert_eq!(document.as_ref(), wire.as_slice());
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    fn interrupted_read_retries() {
        let wire = request_wire(6);
        let inner = InterruptedThenData { state: 0, bytes: wire.clone(), pos: 0 };
        let mut reader = DocumentReader::new(inner);
        let document = reader.read_document().unwrap();
        assert_eq!(document.as_ref(), wire.as_slice());
    }

    struct InterruptedThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn oversized_document_in_stream() {
        let mut wire = b"<PatrolDevice>".to_vec();
        wire.extend_from_slice(&vec![b'x'; 128]);
        let mut reader = DocumentReader::with_max_document(Cursor::new(wire), 64);
        let err = reader.read_document().unwrap_err();
        assert!(matches!(err, ProtoError::DocumentTooLarge { .. }));
    }
}
