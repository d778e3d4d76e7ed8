//! Message model: type codes, command enums, and payload records.

use serde::{Deserialize, Serialize};

/// `<Command>` sub-code: speed control (float `<Value>` plus a `<Cmd>`
/// direction selector).
pub const SUB_SPEED: i32 = 10;
/// `<Command>` sub-code: action control.
pub const SUB_ACTION: i32 = 11;
/// `<Command>` sub-code: configuration parameter.
pub const SUB_CONFIGURE: i32 = 12;
/// `<Command>` sub-code: body height switch.
pub const SUB_BODY_HEIGHT: i32 = 13;
/// `<Command>` sub-code: gait switch (integer `<Value>` on the response).
pub const SUB_GAIT: i32 = 20;

/// `<Command>` code carried by non-motion messages.
pub const COMMAND_DEFAULT: i32 = 1;

/// Every message kind the protocol defines, requests and responses alike.
///
/// The server echoes the request's `<Type>` code on the response; direction
/// disambiguates, so [`decode_response`](crate::decode_response) maps an
/// inbound code to the `*Resp` variant and
/// [`decode_request`](crate::decode_request) to the `*Req` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    MotionControlReq,
    MotionControlResp,
    RealTimeStatusReq,
    RealTimeStatusResp,
    NavTaskReq,
    NavTaskResp,
    CancelTaskReq,
    CancelTaskResp,
    QueryTaskStatusReq,
    QueryTaskStatusResp,
    RtkFusionReq,
    RtkFusionResp,
    RtkRawReq,
    RtkRawResp,
}

impl MessageType {
    /// The `<Type>` code this message carries on the wire.
    pub fn wire_code(self) -> i32 {
        match self {
            MessageType::MotionControlReq | MessageType::MotionControlResp => 2,
            MessageType::RealTimeStatusReq | MessageType::RealTimeStatusResp => 1002,
            MessageType::NavTaskReq | MessageType::NavTaskResp => 1003,
            MessageType::CancelTaskReq | MessageType::CancelTaskResp => 1004,
            MessageType::QueryTaskStatusReq | MessageType::QueryTaskStatusResp => 1007,
            MessageType::RtkFusionReq | MessageType::RtkFusionResp => 2102,
            MessageType::RtkRawReq | MessageType::RtkRawResp => 2103,
        }
    }

    /// The response type a request of this type waits for, or `None` for
    /// response types.
    pub fn expected_response(self) -> Option<MessageType> {
        match self {
            MessageType::MotionControlReq => Some(MessageType::MotionControlResp),
            MessageType::RealTimeStatusReq => Some(MessageType::RealTimeStatusResp),
            MessageType::NavTaskReq => Some(MessageType::NavTaskResp),
            MessageType::CancelTaskReq => Some(MessageType::CancelTaskResp),
            MessageType::QueryTaskStatusReq => Some(MessageType::QueryTaskStatusResp),
            MessageType::RtkFusionReq => Some(MessageType::RtkFusionResp),
            MessageType::RtkRawReq => Some(MessageType::RtkRawResp),
            _ => None,
        }
    }

    /// Map an inbound `<Type>` code to the response variant it denotes.
    pub fn response_from_code(code: i32) -> Option<MessageType> {
        match code {
            2 => Some(MessageType::MotionControlResp),
            1002 => Some(MessageType::RealTimeStatusResp),
            1003 => Some(MessageType::NavTaskResp),
            1004 => Some(MessageType::CancelTaskResp),
            1007 => Some(MessageType::QueryTaskStatusResp),
            2102 => Some(MessageType::RtkFusionResp),
            2103 => Some(MessageType::RtkRawResp),
            _ => None,
        }
    }

    /// Map an inbound `<Type>` code to the request variant it denotes.
    pub fn request_from_code(code: i32) -> Option<MessageType> {
        match code {
            2 => Some(MessageType::MotionControlReq),
            1002 => Some(MessageType::RealTimeStatusReq),
            1003 => Some(MessageType::NavTaskReq),
            1004 => Some(MessageType::CancelTaskReq),
            1007 => Some(MessageType::QueryTaskStatusReq),
            2102 => Some(MessageType::RtkFusionReq),
            2103 => Some(MessageType::RtkRawReq),
            _ => None,
        }
    }
}

/// Speed-command direction selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedCommand {
    Forward,
    Backward,
    TransverseLeft,
    TransverseRight,
    TurnLeft,
    TurnRight,
}

impl SpeedCommand {
    pub fn code(self) -> i32 {
        match self {
            SpeedCommand::Forward => 1,
            SpeedCommand::Backward => 2,
            SpeedCommand::TransverseLeft => 3,
            SpeedCommand::TransverseRight => 4,
            SpeedCommand::TurnLeft => 5,
            SpeedCommand::TurnRight => 6,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(SpeedCommand::Forward),
            2 => Some(SpeedCommand::Backward),
            3 => Some(SpeedCommand::TransverseLeft),
            4 => Some(SpeedCommand::TransverseRight),
            5 => Some(SpeedCommand::TurnLeft),
            6 => Some(SpeedCommand::TurnRight),
            _ => None,
        }
    }
}

/// Discrete action commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionCommand {
    /// End motion control.
    MotionControlOver,
    /// Software emergency stop.
    SoftEmergencyStop,
    /// Stop and stand still.
    Stop,
    /// Finish and lie down.
    Finish,
    /// Stand up.
    StandUp,
    /// Switch to force control.
    Force,
    /// Start stepping in place.
    StartStepping,
    /// Walk to the charging dock.
    GoCharge,
    /// Leave the charging dock.
    ExitCharge,
}

impl ActionCommand {
    pub fn code(self) -> i32 {
        match self {
            ActionCommand::MotionControlOver => 1,
            ActionCommand::SoftEmergencyStop => 2,
            ActionCommand::Stop => 3,
            ActionCommand::Finish => 4,
            ActionCommand::StandUp => 5,
            ActionCommand::Force => 6,
            ActionCommand::StartStepping => 7,
            ActionCommand::GoCharge => 8,
            ActionCommand::ExitCharge => 9,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(ActionCommand::MotionControlOver),
            2 => Some(ActionCommand::SoftEmergencyStop),
            3 => Some(ActionCommand::Stop),
            4 => Some(ActionCommand::Finish),
            5 => Some(ActionCommand::StandUp),
            6 => Some(ActionCommand::Force),
            7 => Some(ActionCommand::StartStepping),
            8 => Some(ActionCommand::GoCharge),
            9 => Some(ActionCommand::ExitCharge),
            _ => None,
        }
    }
}

/// Configuration parameter selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigCommand {
    ObstacleAvoidance,
    SpeedGear,
}

impl ConfigCommand {
    pub fn code(self) -> i32 {
        match self {
            ConfigCommand::ObstacleAvoidance => 1,
            ConfigCommand::SpeedGear => 2,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(ConfigCommand::ObstacleAvoidance),
            2 => Some(ConfigCommand::SpeedGear),
            _ => None,
        }
    }
}

/// Gait selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaitMode {
    Walking,
    NormalStepping,
    SlopeAntiSlip,
    SensingStepping,
}

impl GaitMode {
    pub fn code(self) -> i32 {
        match self {
            GaitMode::Walking => 0,
            GaitMode::NormalStepping => 1,
            GaitMode::SlopeAntiSlip => 2,
            GaitMode::SensingStepping => 4,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(GaitMode::Walking),
            1 => Some(GaitMode::NormalStepping),
            2 => Some(GaitMode::SlopeAntiSlip),
            4 => Some(GaitMode::SensingStepping),
            _ => None,
        }
    }
}

/// Scalar payload of a motion-control message.
///
/// Gait responses carry an integer; every other sub-command carries a float.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionValue {
    Int(i32),
    Float(f32),
}

impl MotionValue {
    pub fn as_f32(self) -> f32 {
        match self {
            MotionValue::Int(v) => v as f32,
            MotionValue::Float(v) => v,
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            MotionValue::Int(v) => v,
            MotionValue::Float(v) => v as i32,
        }
    }
}

impl Default for MotionValue {
    fn default() -> Self {
        MotionValue::Float(0.0)
    }
}

/// One motion-control submission: the sub-command plus its argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionCommand {
    Speed { direction: SpeedCommand, speed: f32 },
    Action(ActionCommand),
    Configure { option: ConfigCommand, value: i32 },
    BodyHeight(i32),
    Gait(GaitMode),
}

impl MotionCommand {
    /// The `<Command>` sub-code.
    pub fn sub_code(&self) -> i32 {
        match self {
            MotionCommand::Speed { .. } => SUB_SPEED,
            MotionCommand::Action(_) => SUB_ACTION,
            MotionCommand::Configure { .. } => SUB_CONFIGURE,
            MotionCommand::BodyHeight(_) => SUB_BODY_HEIGHT,
            MotionCommand::Gait(_) => SUB_GAIT,
        }
    }

    /// The `<Cmd>` selector, for sub-commands that carry both an enum and a
    /// scalar.
    pub fn selector(&self) -> Option<i32> {
        match self {
            MotionCommand::Speed { direction, .. } => Some(direction.code()),
            MotionCommand::Configure { option, .. } => Some(option.code()),
            _ => None,
        }
    }

    /// The scalar carried as `<Value>`.
    pub fn value(&self) -> MotionValue {
        match self {
            MotionCommand::Speed { speed, .. } => MotionValue::Float(*speed),
            MotionCommand::Action(cmd) => MotionValue::Int(cmd.code()),
            MotionCommand::Configure { value, .. } => MotionValue::Int(*value),
            MotionCommand::BodyHeight(height) => MotionValue::Int(*height),
            MotionCommand::Gait(mode) => MotionValue::Int(mode.code()),
        }
    }
}

/// One waypoint of a navigation task.
///
/// Serde uses the camelCase keys of the standard waypoint JSON objects, so a
/// point is constructible straight from one.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NavigationPoint {
    pub map_id: i32,
    pub value: i32,
    pub pos_x: f32,
    pub pos_y: f32,
    pub pos_z: f32,
    pub angle_yaw: f32,
    pub point_info: i32,
    pub gait: i32,
    pub speed: i32,
    pub manner: i32,
    pub obs_mode: i32,
    pub nav_mode: i32,
    pub terrain: i32,
    pub posture: i32,
}

impl NavigationPoint {
    /// Build a point from a JSON object with the standard waypoint keys.
    pub fn from_json(value: &serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value.clone())
    }
}

/// Motion-control request payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionControlRequest {
    pub command: MotionCommand,
}

/// Motion-control response payload.
///
/// `value` is an integer for gait responses and a float otherwise; the
/// decoder applies that rule from the `<Command>` code.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionControlResponse {
    pub command: i32,
    pub value: MotionValue,
    pub error_code: i32,
}

/// Telemetry snapshot payload.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RealTimeStatusResponse {
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
}

/// Navigation task submission payload. Point order is significant and
/// preserved on the wire.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NavigationTaskRequest {
    pub points: Vec<NavigationPoint>,
}

/// Navigation task completion payload.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NavigationTaskResponse {
    pub value: i32,
    pub error_code: i32,
    pub error_status: i32,
}

/// Cancel acknowledgement payload.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CancelTaskResponse {
    pub error_code: i32,
}

/// Task status query payload.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QueryTaskStatusResponse {
    pub status: i32,
    pub error_code: i32,
    pub value: i32,
}

/// GNSS reading payload, fused or raw.
///
/// Longitude and latitude are doubles; single precision cannot carry GNSS
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RtkDataResponse {
    pub longitude: f64,
    pub latitude: f64,
    pub elp_height: f32,
    pub yaw: f32,
}

/// Type-specific message payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    MotionControlReq(MotionControlRequest),
    MotionControlResp(MotionControlResponse),
    RealTimeStatusReq,
    RealTimeStatusResp(RealTimeStatusResponse),
    NavTaskReq(NavigationTaskRequest),
    NavTaskResp(NavigationTaskResponse),
    CancelTaskReq,
    CancelTaskResp(CancelTaskResponse),
    QueryTaskStatusReq,
    QueryTaskStatusResp(QueryTaskStatusResponse),
    RtkFusionReq,
    RtkFusionResp(RtkDataResponse),
    RtkRawReq,
    RtkRawResp(RtkDataResponse),
}

impl Body {
    pub fn message_type(&self) -> MessageType {
        match self {
            Body::MotionControlReq(_) => MessageType::MotionControlReq,
            Body::MotionControlResp(_) => MessageType::MotionControlResp,
            Body::RealTimeStatusReq => MessageType::RealTimeStatusReq,
            Body::RealTimeStatusResp(_) => MessageType::RealTimeStatusResp,
            Body::NavTaskReq(_) => MessageType::NavTaskReq,
            Body::NavTaskResp(_) => MessageType::NavTaskResp,
            Body::CancelTaskReq => MessageType::CancelTaskReq,
            Body::CancelTaskResp(_) => MessageType::CancelTaskResp,
            Body::QueryTaskStatusReq => MessageType::QueryTaskStatusReq,
            Body::QueryTaskStatusResp(_) => MessageType::QueryTaskStatusResp,
            Body::RtkFusionReq => MessageType::RtkFusionReq,
            Body::RtkFusionResp(_) => MessageType::RtkFusionResp,
            Body::RtkRawReq => MessageType::RtkRawReq,
            Body::RtkRawResp(_) => MessageType::RtkRawResp,
        }
    }
}

/// One protocol frame: a sequence number, a wall-clock timestamp, and a
/// type-specific body.
///
/// Sequence numbers pair a response with its request; the timestamp is
/// informational only.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub seq: u16,
    pub timestamp: String,
    pub body: Body,
}

impl Message {
    /// Build an outbound message stamped with the current wall-clock time.
    pub fn request(seq: u16, body: Body) -> Self {
        Self {
            seq,
            timestamp: wall_clock_timestamp(),
            body,
        }
    }

    pub fn message_type(&self) -> MessageType {
        self.body.message_type()
    }
}

/// Wall-clock timestamp in the protocol's `YYYY-MM-DD HH:MM:SS` format.
pub fn wall_clock_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
