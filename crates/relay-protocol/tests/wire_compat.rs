// Verify the JSON wire format chat clients rely on.
// These tests ensure protocol compatibility is never broken.

use relay_protocol::frames::{ChatFrame, ClientFrame, HistoryEntry, ServerFrame};

#[test]
fn join_frame_parses() {
    let json = r#"{"type":"join","username":"alice"}"#;
    let frame: ClientFrame = serde_json::from_str(json).unwrap();
    assert_eq!(
        frame,
        ClientFrame::Join {
            username: "alice".to_string()
        }
    );
}

#[test]
fn message_frame_parses() {
    let json = r#"{"type":"message","message":"hello"}"#;
    let frame: ClientFrame = serde_json::from_str(json).unwrap();
    match frame {
        ClientFrame::Message { message } => assert_eq!(message, "hello"),
        other => panic!("expected message frame, got {other:?}"),
    }
}

#[test]
fn unknown_client_frame_type_is_rejected() {
    let json = r#"{"type":"typing","username":"alice"}"#;
    assert!(serde_json::from_str::<ClientFrame>(json).is_err());
}

#[test]
fn chat_frame_is_flattened_under_message_tag() {
    let frame = ServerFrame::from(ChatFrame::new("alice", "hi"));
    let json = frame.to_json().unwrap();

    assert!(json.contains(r#""type":"message""#));
    assert!(json.contains(r#""origin":"server""#));
    assert!(json.contains(r#""sender":"alice""#));
    assert!(json.contains(r#""message":"hi""#));
    assert!(json.contains(r#""timestamp":""#));
}

#[test]
fn chat_frame_timestamp_is_clock_time() {
    let frame = ChatFrame::new("alice", "hi");
    // HH:MM:SS
    assert_eq!(frame.timestamp.len(), 8);
    assert_eq!(frame.timestamp.matches(':').count(), 2);
}

#[test]
fn history_frame_serialization() {
    let frame = ServerFrame::History {
        data: vec![HistoryEntry::new("bob", "earlier line")],
    };
    let value: serde_json::Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();

    assert_eq!(value["type"], "history");
    assert_eq!(value["data"][0]["username"], "bob");
    assert_eq!(value["data"][0]["message"], "earlier line");
    assert!(value["data"][0]["timestamp"].is_string());
}

#[test]
fn error_frame_serialization() {
    let json = ServerFrame::error("JOIN_TIMEOUT", "join not received")
        .to_json()
        .unwrap();
    assert!(json.contains(r#""type":"error""#));
    assert!(json.contains(r#""code":"JOIN_TIMEOUT""#));
}

#[test]
fn server_frame_parses_back() {
    let json = r#"{"type":"message","origin":"server","sender":"SERVER","message":"bob joined the chat!","timestamp":"10:00:00"}"#;
    let frame: ServerFrame = serde_json::from_str(json).unwrap();
    match frame {
        ServerFrame::Message(chat) => {
            assert_eq!(chat.sender, "SERVER");
            assert_eq!(chat.timestamp, "10:00:00");
        }
        other => panic!("expected message frame, got {other:?}"),
    }
}
