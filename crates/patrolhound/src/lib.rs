//! Client SDK for a quadruped patrol robot's control server.
//!
//! This is the "just works" layer. Connect to the control server, issue
//! synchronous request/response calls from any thread, and receive
//! navigation task completions through registered callbacks.
//!
//! Every request carries a process-wide sequence number; the [`Correlator`]
//! pairs each inbound response with the call waiting on it, enforces
//! per-request timeouts, and routes navigation completions. Calls never
//! panic across the API: each operation returns a result record whose
//! `error_code` field reports the outcome.

pub mod client;
pub mod config;
pub mod correlator;
pub mod error;
pub mod results;

pub use client::RobotClient;
pub use config::ClientOptions;
pub use correlator::{Correlator, NavigationCallback, ResponseWaiter, WaitOutcome};
pub use error::{ClientError, Result};
pub use results::{
    CancelNavResult, MotionControlResult, MotionErrorCode, NavErrorStatus, NavigationErrorCode,
    NavigationResult, QueryErrorCode, RealTimeStatus, RtkErrorCode, RtkFusionData, RtkRawData,
    StatusErrorCode, TaskStatus, TaskStatusResult,
};

pub use patrolhound_proto::{
    ActionCommand, ConfigCommand, GaitMode, MotionValue, NavigationPoint, SpeedCommand,
};
