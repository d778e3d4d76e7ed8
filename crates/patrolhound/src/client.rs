//! The client facade: connection lifecycle plus one operation per request
//! kind.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use patrolhound_proto::{
    decode_response, encode_message, ActionCommand, Body, ConfigCommand, DocumentReader,
    DocumentWriter, GaitMode, Message, MotionCommand, MotionControlRequest, NavigationPoint,
    NavigationTaskRequest, ProtoError, SpeedCommand,
};
use patrolhound_transport::TcpLink;
use tracing::{debug, error, warn};

use crate::config::ClientOptions;
use crate::correlator::{invoke_guarded, Correlator, WaitOutcome};
use crate::error::Result;
use crate::results::{
    CancelNavResult, MotionControlResult, MotionErrorCode, NavigationErrorCode, NavigationResult,
    QueryErrorCode, RealTimeStatus, RtkErrorCode, RtkFusionData, RtkRawData, StatusErrorCode,
    TaskStatus, TaskStatusResult,
};

/// Minimum interval between two speed-control sends.
const MIN_SPEED_COMMAND_INTERVAL: Duration = Duration::from_millis(200);

/// Why a synchronous call did not produce a response message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallFailure {
    NotConnected,
    Timeout,
    InvalidResponse,
    /// Encode or send failure; surfaces as the kind's `UnknownError`.
    Internal,
}

impl CallFailure {
    /// Whether the request reached the wire before the call failed.
    fn sent(self) -> bool {
        matches!(self, CallFailure::Timeout | CallFailure::InvalidResponse)
    }
}

struct Connection {
    writer: DocumentWriter<TcpLink>,
    link: TcpLink,
    reader: Option<JoinHandle<()>>,
}

/// Client handle for a quadruped patrol robot's control server.
///
/// All operations take `&self`; the handle is safe to share across threads.
/// Request operations report their outcome through the `error_code` field of
/// the returned record and never panic across the API boundary.
pub struct RobotClient {
    options: ClientOptions,
    correlator: Arc<Correlator>,
    connected: Arc<AtomicBool>,
    conn: Mutex<Option<Connection>>,
    last_speed_send: Mutex<Option<Instant>>,
}

impl RobotClient {
    pub fn new(options: ClientOptions) -> Self {
        Self {
            options,
            correlator: Arc::new(Correlator::new()),
            connected: Arc::new(AtomicBool::new(false)),
            conn: Mutex::new(None),
            last_speed_send: Mutex::new(None),
        }
    }

    /// SDK version string.
    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Connect to the control server. A no-op when already connected.
    ///
    /// Spawns the connection's reader thread; inbound frames are decoded
    /// there and handed to the correlator.
    pub fn connect(&self, host: &str, port: u16) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        if conn.is_some() && self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }
        // Clear the remnants of a dead connection before dialing again.
        if let Some(old) = conn.take() {
            teardown(old);
        }

        let link = TcpLink::connect(host, port, self.options.connection_timeout)?;
        let reader_link = link.try_clone()?;
        let writer = DocumentWriter::new(link.try_clone()?);

        self.connected.store(true, Ordering::SeqCst);
        let correlator = Arc::clone(&self.correlator);
        let connected = Arc::clone(&self.connected);
        let reader = match thread::Builder::new()
            .name("patrolhound-reader".to_string())
            .spawn(move || reader_loop(reader_link, correlator, connected))
        {
            Ok(handle) => handle,
            Err(err) => {
                self.connected.store(false, Ordering::SeqCst);
                return Err(err.into());
            }
        };

        *conn = Some(Connection {
            writer,
            link,
            reader: Some(reader),
        });
        Ok(())
    }

    /// Disconnect from the control server and join the reader thread.
    /// Idempotent. In-flight synchronous calls run into their timeouts;
    /// registered navigation callbacks fire with `NotConnected`.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let conn = self.conn.lock().unwrap().take();
        if let Some(conn) = conn {
            teardown(conn);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Fetch a telemetry snapshot.
    pub fn real_time_status(&self) -> RealTimeStatus {
        match self.sync_call(Body::RealTimeStatusReq) {
            Ok(message) => match message.body {
                Body::RealTimeStatusResp(resp) => RealTimeStatus::from_response(&resp),
                _ => RealTimeStatus::with_error(StatusErrorCode::InvalidResponse),
            },
            Err(failure) => RealTimeStatus::with_error(match failure {
                CallFailure::NotConnected => StatusErrorCode::NotConnected,
                CallFailure::Timeout => StatusErrorCode::Timeout,
                CallFailure::InvalidResponse => StatusErrorCode::InvalidResponse,
                CallFailure::Internal => StatusErrorCode::UnknownError,
            }),
        }
    }

    /// Submit a navigation task and return immediately.
    ///
    /// `callback` is invoked exactly once: with the server's completion when
    /// it arrives, or with an error result when validation or the send
    /// fails. There is no client-side timeout on completions.
    pub fn start_nav_task<F>(&self, points: Vec<NavigationPoint>, callback: F)
    where
        F: FnOnce(NavigationResult) + Send + 'static,
    {
        if points.is_empty() {
            invoke_guarded(
                Box::new(callback),
                NavigationResult::with_error(NavigationErrorCode::InvalidParam),
            );
            return;
        }
        if !self.is_connected() {
            invoke_guarded(
                Box::new(callback),
                NavigationResult::with_error(NavigationErrorCode::NotConnected),
            );
            return;
        }

        let seq = self.correlator.begin_async(Box::new(callback));
        let message = Message::request(seq, Body::NavTaskReq(NavigationTaskRequest { points }));
        if let Err(failure) = self.send_request(&message) {
            // The completion can no longer arrive; fail the callback now
            // unless a racing delivery already consumed it.
            if let Some(callback) = self.correlator.take_nav_callback(seq) {
                let code = match failure {
                    CallFailure::NotConnected => NavigationErrorCode::NotConnected,
                    _ => NavigationErrorCode::UnknownError,
                };
                invoke_guarded(callback, NavigationResult::with_error(code));
            }
        }
    }

    /// Abort the in-flight navigation task.
    pub fn cancel_nav_task(&self) -> CancelNavResult {
        match self.sync_call(Body::CancelTaskReq) {
            Ok(message) => match message.body {
                Body::CancelTaskResp(resp) => CancelNavResult {
                    error_code: NavigationErrorCode::from_wire(resp.error_code),
                },
                _ => CancelNavResult {
                    error_code: NavigationErrorCode::InvalidResponse,
                },
            },
            Err(failure) => CancelNavResult {
                error_code: match failure {
                    CallFailure::NotConnected => NavigationErrorCode::NotConnected,
                    CallFailure::Timeout => NavigationErrorCode::Timeout,
                    CallFailure::InvalidResponse => NavigationErrorCode::InvalidResponse,
                    CallFailure::Internal => NavigationErrorCode::UnknownError,
                },
            },
        }
    }

    /// Query the state of the current navigation task.
    pub fn nav_task_state(&self) -> TaskStatusResult {
        match self.sync_call(Body::QueryTaskStatusReq) {
            Ok(message) => match message.body {
                Body::QueryTaskStatusResp(resp) => match TaskStatus::from_wire(resp.status) {
                    Some(status) => TaskStatusResult {
                        status,
                        value: resp.value,
                        error_code: QueryErrorCode::from_wire(resp.error_code),
                    },
                    None => TaskStatusResult::with_error(QueryErrorCode::InvalidResponse),
                },
                _ => TaskStatusResult::with_error(QueryErrorCode::InvalidResponse),
            },
            Err(failure) => TaskStatusResult::with_error(match failure {
                CallFailure::NotConnected => QueryErrorCode::NotConnected,
                CallFailure::Timeout => QueryErrorCode::Timeout,
                CallFailure::InvalidResponse => QueryErrorCode::InvalidResponse,
                CallFailure::Internal => QueryErrorCode::UnknownError,
            }),
        }
    }

    /// Fetch the fused GNSS reading.
    pub fn rtk_fusion_data(&self) -> RtkFusionData {
        match self.sync_call(Body::RtkFusionReq) {
            Ok(message) => match message.body {
                Body::RtkFusionResp(resp) => RtkFusionData::from_response(&resp),
                _ => RtkFusionData::with_error(RtkErrorCode::InvalidResponse),
            },
            Err(failure) => RtkFusionData::with_error(rtk_error(failure)),
        }
    }

    /// Fetch the raw GNSS reading.
    pub fn rtk_raw_data(&self) -> RtkRawData {
        match self.sync_call(Body::RtkRawReq) {
            Ok(message) => match message.body {
                Body::RtkRawResp(resp) => RtkRawData::from_response(&resp),
                _ => RtkRawData::with_error(RtkErrorCode::InvalidResponse),
            },
            Err(failure) => RtkRawData::with_error(rtk_error(failure)),
        }
    }

    /// Issue a speed command.
    ///
    /// Speed commands are rate-limited client-side: a call less than 200 ms
    /// after the previous issued send returns `TooFrequent` without touching
    /// the network.
    pub fn speed_control(&self, direction: SpeedCommand, speed: f32) -> MotionControlResult {
        if !self.is_connected() {
            return MotionControlResult::with_error(MotionErrorCode::NotConnected);
        }
        {
            let last = self.last_speed_send.lock().unwrap();
            if let Some(at) = *last {
                if at.elapsed() < MIN_SPEED_COMMAND_INTERVAL {
                    debug!("speed command rejected by rate gate");
                    return MotionControlResult::with_error(MotionErrorCode::TooFrequent);
                }
            }
        }

        let outcome = self.motion_call(MotionCommand::Speed { direction, speed });
        let sent = match &outcome {
            Ok(_) => true,
            Err(failure) => failure.sent(),
        };
        if sent {
            *self.last_speed_send.lock().unwrap() = Some(Instant::now());
        }
        outcome.unwrap_or_else(|failure| MotionControlResult::with_error(motion_error(failure)))
    }

    /// Execute a discrete action command.
    pub fn action_control(&self, command: ActionCommand) -> MotionControlResult {
        self.motion_result(MotionCommand::Action(command))
    }

    /// Set a configuration parameter.
    pub fn configure(&self, option: ConfigCommand, value: i32) -> MotionControlResult {
        self.motion_result(MotionCommand::Configure { option, value })
    }

    /// Switch body height: 0 standing, 1 prone.
    pub fn switch_body_height(&self, height: i32) -> MotionControlResult {
        self.motion_result(MotionCommand::BodyHeight(height))
    }

    /// Switch the gait mode.
    pub fn switch_gait(&self, mode: GaitMode) -> MotionControlResult {
        self.motion_result(MotionCommand::Gait(mode))
    }

    fn motion_result(&self, command: MotionCommand) -> MotionControlResult {
        self.motion_call(command)
            .unwrap_or_else(|failure| MotionControlResult::with_error(motion_error(failure)))
    }

    fn motion_call(&self, command: MotionCommand) -> std::result::Result<MotionControlResult, CallFailure> {
        let message = self.sync_call(Body::MotionControlReq(MotionControlRequest { command }))?;
        match message.body {
            Body::MotionControlResp(resp) => Ok(MotionControlResult {
                value: resp.value,
                error_code: MotionErrorCode::from_wire(resp.error_code),
            }),
            _ => Err(CallFailure::InvalidResponse),
        }
    }

    /// The shared synchronous skeleton: register, send, wait, take. The
    /// drop guard removes the pending entry on every exit path.
    fn sync_call(&self, body: Body) -> std::result::Result<Message, CallFailure> {
        if !self.is_connected() {
            return Err(CallFailure::NotConnected);
        }
        let expected = body
            .message_type()
            .expected_response()
            .ok_or(CallFailure::Internal)?;

        let (seq, waiter) = self.correlator.begin_sync(expected);
        let _guard = CancelGuard {
            correlator: &self.correlator,
            seq,
        };

        let message = Message::request(seq, body);
        self.send_request(&message)?;

        if waiter.wait_for(self.options.request_timeout) == WaitOutcome::TimedOut {
            return Err(CallFailure::Timeout);
        }

        self.correlator
            .take_response(seq)
            .ok_or(CallFailure::InvalidResponse)
    }

    fn send_request(&self, message: &Message) -> std::result::Result<(), CallFailure> {
        let encoded = match encode_message(message) {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(%err, "failed to encode request");
                return Err(CallFailure::Internal);
            }
        };

        let mut conn = self.conn.lock().unwrap();
        let Some(conn) = conn.as_mut() else {
            return Err(CallFailure::NotConnected);
        };
        if let Err(err) = conn.writer.write_document(&encoded) {
            // A failed send means the link is gone.
            warn!(%err, "send failed; dropping connection");
            self.connected.store(false, Ordering::SeqCst);
            conn.link.shutdown();
            return Err(CallFailure::Internal);
        }
        Ok(())
    }
}

impl Default for RobotClient {
    fn default() -> Self {
        Self::new(ClientOptions::default())
    }
}

impl Drop for RobotClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Removes the pending entry when a synchronous call leaves its scope,
/// whatever the exit path.
struct CancelGuard<'a> {
    correlator: &'a Correlator,
    seq: u16,
}

impl Drop for CancelGuard<'_> {
    fn drop(&mut self) {
        self.correlator.cancel(self.seq);
    }
}

fn teardown(mut conn: Connection) {
    conn.link.shutdown();
    if let Some(handle) = conn.reader.take() {
        let _ = handle.join();
    }
}

fn reader_loop(link: TcpLink, correlator: Arc<Correlator>, connected: Arc<AtomicBool>) {
    let mut reader = DocumentReader::new(link);
    loop {
        let document = match reader.read_document() {
            Ok(document) => document,
            Err(ProtoError::ConnectionClosed) => {
                debug!("control server closed the connection");
                break;
            }
            Err(err) => {
                warn!(%err, "read failed; dropping connection");
                break;
            }
        };
        match decode_response(&document) {
            Ok(message) => correlator.deliver(message),
            // The scanner stays aligned on the closing tag, so one bad
            // document does not desynchronize the stream.
            Err(err) => warn!(%err, "undecodable frame; skipping"),
        }
    }
    connected.store(false, Ordering::SeqCst);
    correlator.fail_nav_callbacks(|| {
        NavigationResult::with_error(NavigationErrorCode::NotConnected)
    });
}

fn motion_error(failure: CallFailure) -> MotionErrorCode {
    match failure {
        CallFailure::NotConnected => MotionErrorCode::NotConnected,
        CallFailure::Timeout => MotionErrorCode::Timeout,
        CallFailure::InvalidResponse => MotionErrorCode::InvalidResponse,
        CallFailure::Internal => MotionErrorCode::UnknownError,
    }
}

fn rtk_error(failure: CallFailure) -> RtkErrorCode {
    match failure {
        CallFailure::NotConnected => RtkErrorCode::NotConnected,
        CallFailure::Timeout => RtkErrorCode::Timeout,
        CallFailure::InvalidResponse => RtkErrorCode::InvalidResponse,
        CallFailure::Internal => RtkErrorCode::UnknownError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_fail_fast_when_not_connected() {
        let client = RobotClient::default();

        assert_eq!(
            client.real_time_status().error_code,
            StatusErrorCode::NotConnected
        );
        assert_eq!(
            client.cancel_nav_task().error_code,
            NavigationErrorCode::NotConnected
        );
        assert_eq!(
            client.nav_task_state().error_code,
            QueryErrorCode::NotConnected
        );
        assert_eq!(
            client.rtk_fusion_data().error_code,
            RtkErrorCode::NotConnected
        );
        assert_eq!(
            client
                .speed_control(SpeedCommand::Forward, 0.5)
                .error_code,
            MotionErrorCode::NotConnected
        );
    }

    #[test]
    fn nav_task_rejects_empty_points() {
        let client = RobotClient::default();
        let (tx, rx) = std::sync::mpsc::channel();
        client.start_nav_task(Vec::new(), move |result| {
            tx.send(result).unwrap();
        });
        let result = rx.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(result.error_code, NavigationErrorCode::InvalidParam);
    }

    #[test]
    fn nav_task_requires_connection() {
        let client = RobotClient::default();
        let (tx, rx) = std::sync::mpsc::channel();
        client.start_nav_task(vec![NavigationPoint::default()], move |result| {
            tx.send(result).unwrap();
        });
        let result = rx.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(result.error_code, NavigationErrorCode::NotConnected);
    }

    #[test]
    fn disconnect_without_connect_is_a_no_op() {
        let client = RobotClient::default();
        client.disconnect();
        client.disconnect();
        assert!(!client.is_connected());
    }
}
