//! End-to-end tests driving a real client against a fake control server on
//! a loopback TCP socket.

use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use patrolhound::{
    ClientOptions, GaitMode, MotionErrorCode, MotionValue, NavigationErrorCode, NavigationPoint,
    RobotClient, RtkErrorCode, SpeedCommand, StatusErrorCode,
};
use patrolhound_proto::{
    decode_request, encode_message, wall_clock_timestamp, Body, DocumentReader, Message,
    MotionControlResponse, NavigationTaskResponse, RealTimeStatusResponse, RtkDataResponse,
};

fn spawn_server<F, R>(serve: F) -> (u16, thread::JoinHandle<R>)
where
    F: FnOnce(TcpStream) -> R + Send + 'static,
    R: Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (sock, _peer) = listener.accept().unwrap();
        sock.set_nodelay(true).ok();
        serve(sock)
    });
    (port, handle)
}

fn reply(sock: &mut TcpStream, message: &Message) {
    let wire = encode_message(message).unwrap();
    sock.write_all(&wire).unwrap();
}

fn response(seq: u16, body: Body) -> Message {
    Message {
        seq,
        timestamp: wall_clock_timestamp(),
        body,
    }
}

#[test]
fn happy_roundtrip_returns_payload() {
    let (port, server) = spawn_server(|mut sock| {
        let mut reader = DocumentReader::new(sock.try_clone().unwrap());
        let request = decode_request(&reader.read_document().unwrap()).unwrap();
        assert_eq!(request.body, Body::RealTimeStatusReq);
        assert_eq!(request.seq, 1, "sequence numbering starts at 1");
        reply(
            &mut sock,
            &response(
                request.seq,
                Body::RealTimeStatusResp(RealTimeStatusResponse {
                    pos_x: 1.5,
                    electricity: 88,
                    ..Default::default()
                }),
            ),
        );
    });

    let client = RobotClient::default();
    client.connect("127.0.0.1", port).unwrap();

    let status = client.real_time_status();
    assert_eq!(status.error_code, StatusErrorCode::Success);
    assert_eq!(status.pos_x, 1.5);
    assert_eq!(status.electricity, 88);

    client.disconnect();
    server.join().unwrap();
}

#[test]
fn timeout_then_stale_response_is_dropped() {
    let (port, server) = spawn_server(|mut sock| {
        let mut reader = DocumentReader::new(sock.try_clone().unwrap());
        let first = decode_request(&reader.read_document().unwrap()).unwrap();
        // Withhold the reply until the caller has timed out.
        thread::sleep(Duration::from_millis(250));
        reply(
            &mut sock,
            &response(first.seq, Body::RealTimeStatusResp(Default::default())),
        );
        let second = decode_request(&reader.read_document().unwrap()).unwrap();
        reply(
            &mut sock,
            &response(
                second.seq,
                Body::RealTimeStatusResp(RealTimeStatusResponse {
                    electricity: 42,
                    ..Default::default()
                }),
            ),
        );
    });

    let client = RobotClient::new(ClientOptions {
        request_timeout: Duration::from_millis(100),
        ..Default::default()
    });
    client.connect("127.0.0.1", port).unwrap();

    let start = Instant::now();
    let first = client.real_time_status();
    let elapsed = start.elapsed();
    assert_eq!(first.error_code, StatusErrorCode::Timeout);
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_millis(250), "timed out too late: {elapsed:?}");

    // Let the stale reply arrive and get dropped, then prove a fresh
    // exchange still works.
    thread::sleep(Duration::from_millis(250));
    let second = client.real_time_status();
    assert_eq!(second.error_code, StatusErrorCode::Success);
    assert_eq!(second.electricity, 42);

    client.disconnect();
    server.join().unwrap();
}

#[test]
fn out_of_order_replies_route_correctly() {
    let (port, server) = spawn_server(|mut sock| {
        let mut reader = DocumentReader::new(sock.try_clone().unwrap());
        let mut requests = Vec::new();
        for _ in 0..2 {
            requests.push(decode_request(&reader.read_document().unwrap()).unwrap());
        }
        for request in requests.iter().rev() {
            let body = match request.body {
                Body::RtkFusionReq => Body::RtkFusionResp(RtkDataResponse {
                    longitude: 116.0,
                    ..Default::default()
                }),
                Body::RtkRawReq => Body::RtkRawResp(RtkDataResponse {
                    longitude: 117.0,
                    ..Default::default()
                }),
                ref other => panic!("unexpected request: {other:?}"),
            };
            reply(&mut sock, &response(request.seq, body));
        }
    });

    let client = Arc::new(RobotClient::default());
    client.connect("127.0.0.1", port).unwrap();

    let fusion_client = Arc::clone(&client);
    let fusion = thread::spawn(move || fusion_client.rtk_fusion_data());
    let raw_client = Arc::clone(&client);
    let raw = thread::spawn(move || raw_client.rtk_raw_data());

    let fusion = fusion.join().unwrap();
    let raw = raw.join().unwrap();

    assert_eq!(fusion.error_code, RtkErrorCode::Success);
    assert_eq!(fusion.longitude, 116.0);
    assert_eq!(raw.error_code, RtkErrorCode::Success);
    assert_eq!(raw.longitude, 117.0);

    client.disconnect();
    server.join().unwrap();
}

#[test]
fn nav_task_callback_fires_exactly_once() {
    let (port, server) = spawn_server(|mut sock| {
        let mut reader = DocumentReader::new(sock.try_clone().unwrap());
        let request = decode_request(&reader.read_document().unwrap()).unwrap();
        let points = match &request.body {
            Body::NavTaskReq(req) => req.points.clone(),
            other => panic!("unexpected request: {other:?}"),
        };
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].pos_x, 0.0);
        assert_eq!(points[1].pos_x, 5.0);

        let completion = response(
            request.seq,
            Body::NavTaskResp(NavigationTaskResponse {
                value: 0,
                error_code: 0,
                error_status: 0,
            }),
        );
        reply(&mut sock, &completion);
        reply(&mut sock, &completion);
        // Hold the socket open so the client reads the duplicate too.
        thread::sleep(Duration::from_millis(150));
    });

    let client = RobotClient::default();
    client.connect("127.0.0.1", port).unwrap();

    // Waypoints arrive as JSON objects in deployments; build them the same way.
    let points = vec![
        NavigationPoint::from_json(&serde_json::json!({ "posX": 0.0, "posY": 0.0 })).unwrap(),
        NavigationPoint::from_json(&serde_json::json!({ "posX": 5.0, "posY": 0.0 })).unwrap(),
    ];
    let (tx, rx) = mpsc::channel();
    let start = Instant::now();
    client.start_nav_task(points, move |result| {
        tx.send(result).unwrap();
    });
    assert!(
        start.elapsed() < Duration::from_millis(100),
        "start_nav_task should return immediately"
    );

    let result = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(result.error_code, NavigationErrorCode::Success);
    assert!(
        rx.recv_timeout(Duration::from_millis(200)).is_err(),
        "duplicate completion must be dropped"
    );

    client.disconnect();
    server.join().unwrap();
}

#[test]
fn speed_commands_are_rate_limited() {
    let (port, server) = spawn_server(|mut sock| {
        let mut reader = DocumentReader::new(sock.try_clone().unwrap());
        let mut sends = 0u32;
        loop {
            let document = match reader.read_document() {
                Ok(document) => document,
                Err(_) => break,
            };
            let request = decode_request(&document).unwrap();
            match &request.body {
                Body::MotionControlReq(req) => {
                    sends += 1;
                    reply(
                        &mut sock,
                        &response(
                            request.seq,
                            Body::MotionControlResp(MotionControlResponse {
                                command: req.command.sub_code(),
                                value: req.command.value(),
                                error_code: 0,
                            }),
                        ),
                    );
                }
                other => panic!("unexpected request: {other:?}"),
            }
        }
        sends
    });

    let client = RobotClient::default();
    client.connect("127.0.0.1", port).unwrap();

    let first = client.speed_control(SpeedCommand::Forward, 0.3);
    assert_eq!(first.error_code, MotionErrorCode::Success);

    let second = client.speed_control(SpeedCommand::Forward, 0.4);
    assert_eq!(second.error_code, MotionErrorCode::TooFrequent);

    thread::sleep(Duration::from_millis(250));
    let third = client.speed_control(SpeedCommand::Forward, 0.5);
    assert_eq!(third.error_code, MotionErrorCode::Success);

    client.disconnect();
    let sends = server.join().unwrap();
    assert_eq!(sends, 2, "the gated command must produce no network send");
}

#[test]
fn gait_switch_reports_integer_value() {
    let (port, server) = spawn_server(|mut sock| {
        let mut reader = DocumentReader::new(sock.try_clone().unwrap());
        let request = decode_request(&reader.read_document().unwrap()).unwrap();
        reply(
            &mut sock,
            &response(
                request.seq,
                Body::MotionControlResp(MotionControlResponse {
                    command: 20,
                    value: MotionValue::Int(1),
                    error_code: 0,
                }),
            ),
        );
    });

    let client = RobotClient::default();
    client.connect("127.0.0.1", port).unwrap();

    let result = client.switch_gait(GaitMode::NormalStepping);
    assert_eq!(result.error_code, MotionErrorCode::Success);
    assert_eq!(result.value, MotionValue::Int(1));

    client.disconnect();
    server.join().unwrap();
}

#[test]
fn disconnect_fails_orphaned_nav_callbacks() {
    let (port, server) = spawn_server(|mut sock| {
        let mut reader = DocumentReader::new(sock.try_clone().unwrap());
        // Swallow the submission and never complete the task.
        let _ = reader.read_document().unwrap();
        let _ = sock.flush();
        thread::sleep(Duration::from_millis(400));
    });

    let client = RobotClient::default();
    client.connect("127.0.0.1", port).unwrap();

    let (tx, rx) = mpsc::channel();
    client.start_nav_task(vec![NavigationPoint::default()], move |result| {
        tx.send(result).unwrap();
    });

    thread::sleep(Duration::from_millis(50));
    client.disconnect();

    let result = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(result.error_code, NavigationErrorCode::NotConnected);

    server.join().unwrap();
}
