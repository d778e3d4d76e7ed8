//! XML codec and incremental document scanner.
//!
//! The scanner delimits frames on the closing `</PatrolDevice>` tag and
//! tolerates whitespace between documents. The decoder collects `<Items>`
//! fields into name/value pairs first; unknown element names are skipped and
//! missing or unparsable fields fall back to zero/empty.

use bytes::{Buf, Bytes, BytesMut};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{ProtoError, Result};
use crate::types::{
    ActionCommand, Body, CancelTaskResponse, ConfigCommand, GaitMode, Message, MessageType,
    MotionCommand, MotionControlRequest, MotionControlResponse, MotionValue, NavigationPoint,
    NavigationTaskRequest, NavigationTaskResponse, QueryTaskStatusResponse,
    RealTimeStatusResponse, RtkDataResponse, SpeedCommand, COMMAND_DEFAULT, SUB_ACTION,
    SUB_BODY_HEIGHT, SUB_CONFIGURE, SUB_GAIT, SUB_SPEED,
};

/// Default maximum size of one document on the wire: 256 KiB.
pub const DEFAULT_MAX_DOCUMENT: usize = 256 * 1024;

const ROOT: &str = "PatrolDevice";
const OPENING_TAG: &[u8] = b"<PatrolDevice>";
const CLOSING_TAG: &[u8] = b"</PatrolDevice>";

/// Extract one complete `<PatrolDevice>` document from the buffer.
///
/// Returns `Ok(None)` if the buffer does not yet hold a complete document.
/// On success, consumes the document bytes (and any leading whitespace).
pub fn scan_document(src: &mut BytesMut, max_document: usize) -> Result<Option<Bytes>> {
    let skip = src
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(src.len());
    if skip > 0 {
        src.advance(skip);
    }
    if src.is_empty() {
        return Ok(None);
    }

    let probe = &src[..src.len().min(OPENING_TAG.len())];
    if !OPENING_TAG.starts_with(probe) {
        return Err(ProtoError::MalformedDocument);
    }

    match find_subsequence(src, CLOSING_TAG) {
        Some(pos) => {
            let end = pos + CLOSING_TAG.len();
            Ok(Some(src.split_to(end).freeze()))
        }
        None if src.len() > max_document => Err(ProtoError::DocumentTooLarge {
            size: src.len(),
            max: max_document,
        }),
        None => Ok(None),
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Serialize a message into one wire document.
pub fn encode_message(message: &Message) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Start(BytesStart::new(ROOT)))?;
    write_elem(
        &mut writer,
        "Type",
        &message.message_type().wire_code().to_string(),
    )?;
    write_elem(&mut writer, "Command", &command_code(&message.body).to_string())?;
    write_elem(&mut writer, "Time", &message.timestamp)?;
    writer.write_event(Event::Start(BytesStart::new("Items")))?;
    write_elem(&mut writer, "SeqNum", &message.seq.to_string())?;
    encode_items(&mut writer, &message.body)?;
    writer.write_event(Event::End(BytesEnd::new("Items")))?;
    writer.write_event(Event::End(BytesEnd::new(ROOT)))?;
    Ok(writer.into_inner())
}

fn command_code(body: &Body) -> i32 {
    match body {
        Body::MotionControlReq(req) => req.command.sub_code(),
        Body::MotionControlResp(resp) => resp.command,
        _ => COMMAND_DEFAULT,
    }
}

fn encode_items(writer: &mut Writer<Vec<u8>>, body: &Body) -> Result<()> {
    match body {
        Body::MotionControlReq(req) => {
            if let Some(selector) = req.command.selector() {
                write_elem(writer, "Cmd", &selector.to_string())?;
            }
            write_elem(writer, "Value", &motion_value_text(req.command.value()))?;
        }
        Body::MotionControlResp(resp) => {
            write_elem(writer, "Value", &motion_value_text(resp.value))?;
            write_elem(writer, "ErrorCode", &resp.error_code.to_string())?;
        }
        Body::RealTimeStatusResp(resp) => encode_real_time_status(writer, resp)?,
        Body::NavTaskReq(req) => {
            for point in &req.points {
                encode_point(writer, point)?;
            }
        }
        Body::NavTaskResp(resp) => {
            write_elem(writer, "Value", &resp.value.to_string())?;
            write_elem(writer, "ErrorCode", &resp.error_code.to_string())?;
            write_elem(writer, "ErrorStatus", &resp.error_status.to_string())?;
        }
        Body::CancelTaskResp(resp) => {
            write_elem(writer, "ErrorCode", &resp.error_code.to_string())?;
        }
        Body::QueryTaskStatusResp(resp) => {
            write_elem(writer, "Status", &resp.status.to_string())?;
            write_elem(writer, "ErrorCode", &resp.error_code.to_string())?;
            write_elem(writer, "Value", &resp.value.to_string())?;
        }
        Body::RtkFusionResp(resp) | Body::RtkRawResp(resp) => {
            write_elem(writer, "Longitude", &resp.longitude.to_string())?;
            write_elem(writer, "Latitude", &resp.latitude.to_string())?;
            write_elem(writer, "ElpHeight", &resp.elp_height.to_string())?;
            write_elem(writer, "Yaw", &resp.yaw.to_string())?;
        }
        // Bare queries carry no payload beyond the sequence number.
        Body::RealTimeStatusReq
        | Body::CancelTaskReq
        | Body::QueryTaskStatusReq
        | Body::RtkFusionReq
        | Body::RtkRawReq => {}
    }
    Ok(())
}

fn encode_real_time_status(
    writer: &mut Writer<Vec<u8>>,
    resp: &RealTimeStatusResponse,
) -> Result<()> {
    write_elem(writer, "MotionState", &resp.motion_state.to_string())?;
    write_elem(writer, "PosX", &resp.pos_x.to_string())?;
    write_elem(writer, "PosY", &resp.pos_y.to_string())?;
    write_elem(writer, "PosZ", &resp.pos_z.to_string())?;
    write_elem(writer, "AngleYaw", &resp.angle_yaw.to_string())?;
    write_elem(writer, "Roll", &resp.roll.to_string())?;
    write_elem(writer, "Pitch", &resp.pitch.to_string())?;
    write_elem(writer, "Yaw", &resp.yaw.to_string())?;
    write_elem(writer, "Speed", &resp.speed.to_string())?;
    write_elem(writer, "CurOdom", &resp.cur_odom.to_string())?;
    write_elem(writer, "SumOdom", &resp.sum_odom.to_string())?;
    write_elem(writer, "CurRuntime", &resp.cur_runtime.to_string())?;
    write_elem(writer, "SumRuntime", &resp.sum_runtime.to_string())?;
    write_elem(writer, "Res", &resp.res.to_string())?;
    write_elem(writer, "X0", &resp.x0.to_string())?;
    write_elem(writer, "Y0", &resp.y0.to_string())?;
    write_elem(writer, "H", &resp.h.to_string())?;
    write_elem(writer, "Electricity", &resp.electricity.to_string())?;
    write_elem(writer, "Location", &resp.location.to_string())?;
    write_elem(writer, "RTKState", &resp.rtk_state.to_string())?;
    write_elem(writer, "OnDockState", &resp.on_dock_state.to_string())?;
    write_elem(writer, "GaitState", &resp.gait_state.to_string())?;
    write_elem(writer, "MotorState", &resp.motor_state.to_string())?;
    write_elem(writer, "ChargeState", &resp.charge_state.to_string())?;
    write_elem(writer, "ControlMode", &resp.control_mode.to_string())?;
    write_elem(writer, "MapUpdateState", &resp.map_update_state.to_string())?;
    Ok(())
}

fn encode_point(writer: &mut Writer<Vec<u8>>, point: &NavigationPoint) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("Point")))?;
    write_elem(writer, "MapId", &point.map_id.to_string())?;
    write_elem(writer, "Value", &point.value.to_string())?;
    write_elem(writer, "PosX", &point.pos_x.to_string())?;
    write_elem(writer, "PosY", &point.pos_y.to_string())?;
    write_elem(writer, "PosZ", &point.pos_z.to_string())?;
    write_elem(writer, "AngleYaw", &point.angle_yaw.to_string())?;
    write_elem(writer, "PointInfo", &point.point_info.to_string())?;
    write_elem(writer, "Gait", &point.gait.to_string())?;
    write_elem(writer, "Speed", &point.speed.to_string())?;
    write_elem(writer, "Manner", &point.manner.to_string())?;
    write_elem(writer, "ObsMode", &point.obs_mode.to_string())?;
    write_elem(writer, "NavMode", &point.nav_mode.to_string())?;
    write_elem(writer, "Terrain", &point.terrain.to_string())?;
    write_elem(writer, "Posture", &point.posture.to_string())?;
    writer.write_event(Event::End(BytesEnd::new("Point")))?;
    Ok(())
}

fn write_elem(writer: &mut Writer<Vec<u8>>, name: &str, value: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn motion_value_text(value: MotionValue) -> String {
    match value {
        MotionValue::Int(v) => v.to_string(),
        MotionValue::Float(v) => v.to_string(),
    }
}

/// Decode one inbound document as a response frame.
pub fn decode_response(data: &[u8]) -> Result<Message> {
    let raw = parse_document(data)?;
    let message_type = MessageType::response_from_code(raw.type_code)
        .ok_or(ProtoError::UnknownType(raw.type_code))?;

    let body = match message_type {
        MessageType::MotionControlResp => {
            // Gait responses carry an integer value; everything else a float.
            let value = if raw.command == SUB_GAIT {
                MotionValue::Int(field(&raw.items, "Value"))
            } else {
                MotionValue::Float(field(&raw.items, "Value"))
            };
            Body::MotionControlResp(MotionControlResponse {
                command: raw.command,
                value,
                error_code: field(&raw.items, "ErrorCode"),
            })
        }
        MessageType::RealTimeStatusResp => {
            Body::RealTimeStatusResp(decode_real_time_status(&raw.items))
        }
        MessageType::NavTaskResp => Body::NavTaskResp(NavigationTaskResponse {
            value: field(&raw.items, "Value"),
            error_code: field(&raw.items, "ErrorCode"),
            error_status: field(&raw.items, "ErrorStatus"),
        }),
        MessageType::CancelTaskResp => Body::CancelTaskResp(CancelTaskResponse {
            error_code: field(&raw.items, "ErrorCode"),
        }),
        MessageType::QueryTaskStatusResp => Body::QueryTaskStatusResp(QueryTaskStatusResponse {
            status: field(&raw.items, "Status"),
            error_code: field(&raw.items, "ErrorCode"),
            value: field(&raw.items, "Value"),
        }),
        MessageType::RtkFusionResp => Body::RtkFusionResp(decode_rtk(&raw.items)),
        MessageType::RtkRawResp => Body::RtkRawResp(decode_rtk(&raw.items)),
        _ => unreachable!("response_from_code yields response variants only"),
    };

    Ok(Message {
        seq: raw.seq(),
        timestamp: raw.time,
        body,
    })
}

/// Decode one inbound document as a request frame. Servers (and the test
/// suites' fake server) use this; the client never does.
pub fn decode_request(data: &[u8]) -> Result<Message> {
    let raw = parse_document(data)?;
    let message_type = MessageType::request_from_code(raw.type_code)
        .ok_or(ProtoError::UnknownType(raw.type_code))?;

    let body = match message_type {
        MessageType::MotionControlReq => {
            let command = decode_motion_command(&raw)?;
            Body::MotionControlReq(MotionControlRequest { command })
        }
        MessageType::NavTaskReq => {
            let points = raw.points.iter().map(|fields| decode_point(fields)).collect();
            Body::NavTaskReq(NavigationTaskRequest { points })
        }
        MessageType::RealTimeStatusReq => Body::RealTimeStatusReq,
        MessageType::CancelTaskReq => Body::CancelTaskReq,
        MessageType::QueryTaskStatusReq => Body::QueryTaskStatusReq,
        MessageType::RtkFusionReq => Body::RtkFusionReq,
        MessageType::RtkRawReq => Body::RtkRawReq,
        _ => unreachable!("request_from_code yields request variants only"),
    };

    Ok(Message {
        seq: raw.seq(),
        timestamp: raw.time,
        body,
    })
}

fn decode_motion_command(raw: &RawDoc) -> Result<MotionCommand> {
    let command = match raw.command {
        SUB_SPEED => MotionCommand::Speed {
            direction: SpeedCommand::from_code(field(&raw.items, "Cmd"))
                .unwrap_or(SpeedCommand::Forward),
            speed: field(&raw.items, "Value"),
        },
        SUB_ACTION => MotionCommand::Action(
            ActionCommand::from_code(field(&raw.items, "Value")).unwrap_or(ActionCommand::Stop),
        ),
        SUB_CONFIGURE => MotionCommand::Configure {
            option: ConfigCommand::from_code(field(&raw.items, "Cmd"))
                .unwrap_or(ConfigCommand::ObstacleAvoidance),
            value: field(&raw.items, "Value"),
        },
        SUB_BODY_HEIGHT => MotionCommand::BodyHeight(field(&raw.items, "Value")),
        SUB_GAIT => MotionCommand::Gait(
            GaitMode::from_code(field(&raw.items, "Value")).unwrap_or(GaitMode::Walking),
        ),
        _ => return Err(ProtoError::MalformedDocument),
    };
    Ok(command)
}

fn decode_real_time_status(items: &[(String, String)]) -> RealTimeStatusResponse {
    RealTimeStatusResponse {
        motion_state: field(items, "MotionState"),
        pos_x: field(items, "PosX"),
        pos_y: field(items, "PosY"),
        pos_z: field(items, "PosZ"),
        angle_yaw: field(items, "AngleYaw"),
        roll: field(items, "Roll"),
        pitch: field(items, "Pitch"),
        yaw: field(items, "Yaw"),
        speed: field(items, "Speed"),
        cur_odom: field(items, "CurOdom"),
        sum_odom: field(items, "SumOdom"),
        cur_runtime: field(items, "CurRuntime"),
        sum_runtime: field(items, "SumRuntime"),
        res: field(items, "Res"),
        x0: field(items, "X0"),
        y0: field(items, "Y0"),
        h: field(items, "H"),
        electricity: field(items, "Electricity"),
        location: field(items, "Location"),
        rtk_state: field(items, "RTKState"),
        on_dock_state: field(items, "OnDockState"),
        gait_state: field(items, "GaitState"),
        motor_state: field(items, "MotorState"),
        charge_state: field(items, "ChargeState"),
        control_mode: field(items, "ControlMode"),
        map_update_state: field(items, "MapUpdateState"),
    }
}

fn decode_rtk(items: &[(String, String)]) -> RtkDataResponse {
    RtkDataResponse {
        longitude: field(items, "Longitude"),
        latitude: field(items, "Latitude"),
        elp_height: field(items, "ElpHeight"),
        yaw: field(items, "Yaw"),
    }
}

fn decode_point(fields: &[(String, String)]) -> NavigationPoint {
    NavigationPoint {
        map_id: field(fields, "MapId"),
        value: field(fields, "Value"),
        pos_x: field(fields, "PosX"),
        pos_y: field(fields, "PosY"),
        pos_z: field(fields, "PosZ"),
        angle_yaw: field(fields, "AngleYaw"),
        point_info: field(fields, "PointInfo"),
        gait: field(fields, "Gait"),
        speed: field(fields, "Speed"),
        manner: field(fields, "Manner"),
        obs_mode: field(fields, "ObsMode"),
        nav_mode: field(fields, "NavMode"),
        terrain: field(fields, "Terrain"),
        posture: field(fields, "Posture"),
    }
}

/// Flat view of one parsed document before typing.
#[derive(Debug, Default)]
struct RawDoc {
    type_code: i32,
    command: i32,
    time: String,
    items: Vec<(String, String)>,
    points: Vec<Vec<(String, String)>>,
}

impl RawDoc {
    fn seq(&self) -> u16 {
        field(&self.items, "SeqNum")
    }
}

fn parse_document(data: &[u8]) -> Result<RawDoc> {
    let mut reader = Reader::from_reader(data);
    let mut buf = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut doc = RawDoc::default();
    let mut seen_root = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if stack.is_empty() {
                    if name != ROOT {
                        return Err(ProtoError::MalformedDocument);
                    }
                    seen_root = true;
                }
                if name == "Point" && stack.last().map(String::as_str) == Some("Items") {
                    doc.points.push(Vec::new());
                }
                stack.push(name);
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                let text = text.trim();
                if !text.is_empty() {
                    record_text(&mut doc, &stack, text.to_string());
                }
            }
            Event::Eof => break,
            // Empty elements leave their field at its default; declarations
            // and comments are skipped.
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(ProtoError::MalformedDocument);
    }
    Ok(doc)
}

fn record_text(doc: &mut RawDoc, stack: &[String], text: String) {
    let path: Vec<&str> = stack.iter().map(String::as_str).collect();
    match path.as_slice() {
        ["PatrolDevice", "Type"] => doc.type_code = text.parse().unwrap_or_default(),
        ["PatrolDevice", "Command"] => doc.command = text.parse().unwrap_or_default(),
        ["PatrolDevice", "Time"] => doc.time = text,
        ["PatrolDevice", "Items", "Point"] => {}
        ["PatrolDevice", "Items", name] => doc.items.push(((*name).to_string(), text)),
        ["PatrolDevice", "Items", "Point", name] => {
            if let Some(point) = doc.points.last_mut() {
                point.push(((*name).to_string(), text));
            }
        }
        _ => {}
    }
}

fn field<T: std::str::FromStr + Default>(fields: &[(String, String)], name: &str) -> T {
    fields
        .iter()
        .find(|(field_name, _)| field_name == name)
        .and_then(|(_, value)| value.parse().ok())
        .unwrap_or_default()
}
