/// Errors that can occur while framing or (de)coding protocol documents.
#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    /// The buffered document exceeds the configured maximum size.
    #[error("document too large ({size} bytes, max {max})")]
    DocumentTooLarge { size: usize, max: usize },

    /// The stream does not hold a `<PatrolDevice>` document where one is
    /// expected.
    #[error("malformed document (expected <PatrolDevice> root)")]
    MalformedDocument,

    /// XML-level parse or write failure.
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The `<Type>` code does not name a message this side understands.
    #[error("unknown message type code: {0}")]
    UnknownType(i32),

    /// An I/O error occurred while reading or writing documents.
    #[error("document I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete document was received.
    #[error("connection closed (incomplete document)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, ProtoError>;
