//! Wire protocol for the patrolhound control server.
//!
//! One XML document per frame. Every document's root element is
//! `<PatrolDevice>` carrying:
//! - `<Type>`: the request/response code,
//! - `<Command>`: the sub-command code where applicable,
//! - `<Time>`: a human-readable wall-clock timestamp,
//! - `<Items>`: the payload fields, starting with `<SeqNum>`.
//!
//! Frames are delimited by the closing `</PatrolDevice>` tag; the scanner in
//! [`codec`] turns a byte stream into complete documents and the reader and
//! writer wrap any `Read`/`Write` stream. No partial reads, no buffer
//! management in user code.

pub mod codec;
pub mod error;
pub mod reader;
pub mod types;
pub mod writer;

pub use codec::{
    decode_request, decode_response, encode_message, scan_document, DEFAULT_MAX_DOCUMENT,
};
pub use error::{ProtoError, Result};
pub use reader::DocumentReader;
pub use types::{
    wall_clock_timestamp, ActionCommand, Body, CancelTaskResponse, ConfigCommand, GaitMode,
    Message, MessageType, MotionCommand, MotionControlRequest, MotionControlResponse, MotionValue,
    NavigationPoint, NavigationTaskRequest, NavigationTaskResponse, QueryTaskStatusResponse,
    RealTimeStatusResponse, RtkDataResponse, SpeedCommand, SUB_ACTION, SUB_BODY_HEIGHT,
    SUB_CONFIGURE, SUB_GAIT, SUB_SPEED,
};
pub use writer::DocumentWriter;
