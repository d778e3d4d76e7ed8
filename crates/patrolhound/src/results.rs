//! Public result records and per-kind error codes.
//!
//! Errors are values: every operation returns a record whose `error_code`
//! reports the outcome, zeroed data fields accompanying any failure. Wire
//! error integers map onto these enums with unrecognized values collapsing
//! to `UnknownError`.

use patrolhound_proto::{Body, Message, MotionValue, RealTimeStatusResponse, RtkDataResponse};

/// Outcome of a telemetry snapshot request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusErrorCode {
    #[default]
    Success,
    NotConnected,
    Timeout,
    InvalidResponse,
    UnknownError,
}

/// Outcome of a motion-control submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionErrorCode {
    #[default]
    Success,
    /// The server reported the command was not applied.
    Failure,
    NotConnected,
    Timeout,
    InvalidResponse,
    /// Less than the minimum interval since the previous speed command.
    TooFrequent,
    UnknownError,
}

impl MotionErrorCode {
    pub(crate) fn from_wire(code: i32) -> Self {
        match code {
            0 => MotionErrorCode::Success,
            1 => MotionErrorCode::Failure,
            _ => MotionErrorCode::UnknownError,
        }
    }
}

/// Outcome of a navigation task submission or cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavigationErrorCode {
    #[default]
    Success,
    /// Rejected before sending: empty point list.
    InvalidParam,
    NotConnected,
    Timeout,
    InvalidResponse,
    UnknownError,
}

impl NavigationErrorCode {
    pub(crate) fn from_wire(code: i32) -> Self {
        match code {
            0 => NavigationErrorCode::Success,
            2 => NavigationErrorCode::InvalidParam,
            _ => NavigationErrorCode::UnknownError,
        }
    }
}

/// Server-reported detail accompanying a navigation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavErrorStatus {
    #[default]
    None,
    LowBattery,
    MotorOverheat,
    EmergencyStop,
    Charging,
    Unknown,
}

impl NavErrorStatus {
    pub(crate) fn from_wire(code: i32) -> Self {
        match code {
            0 => NavErrorStatus::None,
            1 => NavErrorStatus::LowBattery,
            2 => NavErrorStatus::MotorOverheat,
            3 => NavErrorStatus::EmergencyStop,
            4 => NavErrorStatus::Charging,
            _ => NavErrorStatus::Unknown,
        }
    }
}

/// Outcome of a task status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryErrorCode {
    #[default]
    Success,
    NotConnected,
    Timeout,
    InvalidResponse,
    UnknownError,
}

impl QueryErrorCode {
    pub(crate) fn from_wire(code: i32) -> Self {
        match code {
            0 => QueryErrorCode::Success,
            _ => QueryErrorCode::UnknownError,
        }
    }
}

/// Outcome of an RTK data request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RtkErrorCode {
    #[default]
    Success,
    NotConnected,
    Timeout,
    InvalidResponse,
    UnknownError,
}

/// Execution state of the current navigation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskStatus {
    #[default]
    Waiting,
    Executing,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub(crate) fn from_wire(code: i32) -> Option<Self> {
        match code {
            0 => Some(TaskStatus::Waiting),
            1 => Some(TaskStatus::Executing),
            2 => Some(TaskStatus::Completed),
            3 => Some(TaskStatus::Failed),
            4 => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }
}

/// Telemetry snapshot of the robot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RealTimeStatus {
    pub motion_state: i32,
    pub pos_x: f32,
    pub pos_y: f32,
    pub pos_z: f32,
    pub angle_yaw: f32,
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub speed: f32,
    pub cur_odom: f32,
    pub sum_odom: f32,
    pub cur_runtime: u64,
    pub sum_runtime: u64,
    pub res: i32,
    pub x0: f32,
    pub y0: f32,
    pub h: f32,
    pub electricity: i32,
    pub location: i32,
    pub rtk_state: i32,
    pub on_dock_state: i32,
    pub gait_state: i32,
    pub motor_state: i32,
    pub charge_state: i32,
    pub control_mode: i32,
    pub map_update_state: i32,
    pub error_code: StatusErrorCode,
}

impl RealTimeStatus {
    pub(crate) fn with_error(error_code: StatusErrorCode) -> Self {
        Self {
            error_code,
            ..Default::default()
        }
    }

    pub(crate) fn from_response(resp: &RealTimeStatusResponse) -> Self {
        Self {
            motion_state: resp.motion_state,
            pos_x: resp.pos_x,
            pos_y: resp.pos_y,
            pos_z: resp.pos_z,
            angle_yaw: resp.angle_yaw,
            roll: resp.roll,
            pitch: resp.pitch,
            yaw: resp.yaw,
            speed: resp.speed,
            cur_odom: resp.cur_odom,
            sum_odom: resp.sum_odom,
            cur_runtime: resp.cur_runtime,
            sum_runtime: resp.sum_runtime,
            res: resp.res,
            x0: resp.x0,
            y0: resp.y0,
            h: resp.h,
            electricity: resp.electricity,
            location: resp.location,
            rtk_state: resp.rtk_state,
            on_dock_state: resp.on_dock_state,
            gait_state: resp.gait_state,
            motor_state: resp.motor_state,
            charge_state: resp.charge_state,
            control_mode: resp.control_mode,
            map_update_state: resp.map_update_state,
            error_code: StatusErrorCode::Success,
        }
    }
}

/// Outcome of a navigation task, delivered to the registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavigationResult {
    pub value: i32,
    pub error_code: NavigationErrorCode,
    pub error_status: NavErrorStatus,
}

impl NavigationResult {
    pub(crate) fn with_error(error_code: NavigationErrorCode) -> Self {
        Self {
            error_code,
            ..Default::default()
        }
    }

    /// Build a result from an inbound completion frame.
    pub(crate) fn from_message(message: &Message) -> Self {
        match &message.body {
            Body::NavTaskResp(resp) => Self {
                value: resp.value,
                error_code: NavigationErrorCode::from_wire(resp.error_code),
                error_status: NavErrorStatus::from_wire(resp.error_status),
            },
            _ => Self::with_error(NavigationErrorCode::InvalidResponse),
        }
    }
}

/// Outcome of cancelling the current navigation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CancelNavResult {
    pub error_code: NavigationErrorCode,
}

/// Outcome of a task status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskStatusResult {
    pub status: TaskStatus,
    pub value: i32,
    pub error_code: QueryErrorCode,
}

impl TaskStatusResult {
    pub(crate) fn with_error(error_code: QueryErrorCode) -> Self {
        Self {
            error_code,
            ..Default::default()
        }
    }
}

/// Fused GNSS reading.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RtkFusionData {
    pub longitude: f64,
    pub latitude: f64,
    pub elp_height: f32,
    pub yaw: f32,
    pub error_code: RtkErrorCode,
}

impl RtkFusionData {
    pub(crate) fn with_error(error_code: RtkErrorCode) -> Self {
        Self {
            error_code,
            ..Default::default()
        }
    }

    pub(crate) fn from_response(resp: &RtkDataResponse) -> Self {
        Self {
            longitude: resp.longitude,
            latitude: resp.latitude,
            elp_height: resp.elp_height,
            yaw: resp.yaw,
            error_code: RtkErrorCode::Success,
        }
    }
}

/// Raw GNSS reading.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RtkRawData {
    pub longitude: f64,
    pub latitude: f64,
    pub elp_height: f32,
    pub yaw: f32,
    pub error_code: RtkErrorCode,
}

impl RtkRawData {
    pub(crate) fn with_error(error_code: RtkErrorCode) -> Self {
        Self {
            error_code,
            ..Default::default()
        }
    }

    pub(crate) fn from_response(resp: &RtkDataResponse) -> Self {
        Self {
            longitude: resp.longitude,
            latitude: resp.latitude,
            elp_height: resp.elp_height,
            yaw: resp.yaw,
            error_code: RtkErrorCode::Success,
        }
    }
}

/// Outcome of a motion-control submission.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionControlResult {
    pub value: MotionValue,
    pub error_code: MotionErrorCode,
}

impl MotionControlResult {
    pub(crate) fn with_error(error_code: MotionErrorCode) -> Self {
        Self {
            error_code,
            ..Default::default()
        }
    }
}
