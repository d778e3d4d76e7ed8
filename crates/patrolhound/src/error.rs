/// Errors surfaced by connection management.
///
/// Request operations do not use this type; they report outcomes through the
/// `error_code` field of their result records.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure while connecting or configuring the link.
    #[error("transport error: {0}")]
    Transport(#[from] patrolhound_transport::TransportError),

    /// Protocol-level failure.
    #[error("protocol error: {0}")]
    Proto(#[from] patrolhound_proto::ProtoError),

    /// Failed to start the connection's reader thread.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
