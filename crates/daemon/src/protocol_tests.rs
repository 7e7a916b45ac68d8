// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    ping = { Request::Ping, "daemon:ping" },
    start = { Request::StartRun { run_id: "r1".into() }, "executor:start-run" },
    stop = { Request::StopRun { run_id: "r1".into() }, "executor:stop-run" },
    stop_all = { Request::StopAll, "executor:stop-all" },
    status = { Request::GetStatus { run_id: "r1".into() }, "executor:get-status" },
    list = { Request::ListActive, "executor:list-active" },
    stats = { Request::GetStats, "executor:get-stats" },
    online = { Request::SetOnline { is_online: false }, "executor:set-online" },
)]
fn requests_use_namespaced_wire_names(request: Request, wire_name: &str) {
    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json["type"], wire_name);

    let back: Request = serde_json::from_value(json).unwrap();
    assert_eq!(back, request);
}

#[test]
fn cleanup_defaults_to_seven_days() {
    let request: Request =
        serde_json::from_str(r#"{"type": "executor:cleanup"}"#).unwrap();
    assert_eq!(
        request,
        Request::Cleanup {
            older_than_days: 7
        }
    );
}

#[test]
fn start_run_parses_payload() {
    let request: Request =
        serde_json::from_str(r#"{"type": "executor:start-run", "run_id": "R42"}"#).unwrap();
    assert_eq!(
        request,
        Request::StartRun {
            run_id: "R42".into()
        }
    );
}

#[test]
fn responses_carry_success_envelope() {
    let response = Response::RunStarted {
        success: true,
        run_id: "R1".into(),
    };
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["run_id"], "R1");

    let error = Response::error("boom");
    let json = serde_json::to_value(&error).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "boom");
}

#[tokio::test]
async fn messages_round_trip_over_a_duplex_pipe() {
    let (mut client, mut server) = tokio::io::duplex(4096);

    let request = Request::SetOnline { is_online: true };
    let encoded = encode(&request).unwrap();
    write_message(&mut client, &encoded).await.unwrap();

    let received = read_request(&mut server, DEFAULT_TIMEOUT).await.unwrap();
    assert_eq!(received, request);

    let response = Response::OnlineSet {
        success: true,
        is_online: true,
    };
    write_response(&mut server, &response, DEFAULT_TIMEOUT)
        .await
        .unwrap();

    let bytes = read_message(&mut client).await.unwrap();
    let decoded: Response = decode(&bytes).unwrap();
    match decoded {
        Response::OnlineSet { success, is_online } => {
            assert!(success);
            assert!(is_online);
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn oversized_length_prefix_is_rejected() {
    let (mut client, mut server) = tokio::io::duplex(64);
    let huge = (MAX_MESSAGE_SIZE as u32 + 1).to_be_bytes();
    tokio::io::AsyncWriteExt::write_all(&mut client, &huge)
        .await
        .unwrap();

    let err = read_message(&mut server).await.unwrap_err();
    assert!(matches!(err, ProtocolError::MessageTooLarge { .. }));
}

#[tokio::test]
async fn closed_pipe_reports_connection_closed() {
    let (client, mut server) = tokio::io::duplex(64);
    drop(client);

    let err = read_message(&mut server).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}
