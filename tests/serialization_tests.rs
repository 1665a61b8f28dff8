use rt_whiteboard::error::ApiErrorType;
use rt_whiteboard::protocol::client_events::ClientEvent;
use rt_whiteboard::protocol::models::{Item, ResponseStatus, SessionConfig, SessionToken};
use rt_whiteboard::protocol::server_events::ServerEvent;
use rt_whiteboard::sdk::ToolRegistry;
use serde_json::json;

#[test]
fn test_response_done_with_function_call() {
    let json = json!({
        "type": "response.done",
        "event_id": "event_42",
        "response": {
            "id": "resp_1",
            "status": "completed",
            "output": [{
                "type": "function_call",
                "id": "item_1",
                "status": "completed",
                "name": "display_data",
                "call_id": "call_9",
                "arguments": "{\"chart\":\"pie\",\"data\":[]}"
            }],
            "usage": {"total_tokens": 12}
        }
    });

    let event: ServerEvent = serde_json::from_value(json).expect("Failed to deserialize response.done");
    assert_eq!(event.kind(), "response.done");
    match event {
        ServerEvent::ResponseDone { response, .. } => {
            assert_eq!(response.status, Some(ResponseStatus::Completed));
            match response.first_output() {
                Some(Item::FunctionCall { name, call_id, .. }) => {
                    assert_eq!(name, "display_data");
                    assert_eq!(call_id, "call_9");
                }
                other => panic!("Wrong output item: {other:?}"),
            }
        }
        _ => panic!("Wrong event type"),
    }
}

#[test]
fn test_error_event() {
    let json = json!({
        "type": "error",
        "event_id": "event_7",
        "error": {
            "type": "invalid_request_error",
            "code": "invalid_value",
            "message": "Bad voice",
            "param": "session.voice",
            "event_id": "client_1"
        }
    });

    match serde_json::from_value::<ServerEvent>(json).unwrap() {
        ServerEvent::Error { error, .. } => {
            assert_eq!(error.error_type, ApiErrorType::InvalidRequestError);
            assert_eq!(error.message, "Bad voice");
            assert_eq!(error.param.as_deref(), Some("session.voice"));
        }
        other => panic!("Wrong event: {other:?}"),
    }
}

#[test]
fn test_unhandled_events_are_kept_raw() {
    let json = json!({
        "type": "response.audio_transcript.delta",
        "event_id": "event_3",
        "delta": "Hel"
    });
    let event: ServerEvent = serde_json::from_value(json.clone()).unwrap();
    assert!(matches!(event, ServerEvent::Unknown(_)));
    assert_eq!(event.kind(), "response.audio_transcript.delta");
    assert_eq!(serde_json::to_value(&event).unwrap(), json);
}

#[test]
fn test_unknown_output_items_survive() {
    let json = json!({
        "type": "response.done",
        "response": {
            "id": "resp_2",
            "output": [{"type": "mcp_call", "id": "x"}]
        }
    });
    match serde_json::from_value::<ServerEvent>(json).unwrap() {
        ServerEvent::ResponseDone { response, .. } => {
            let item = response.first_output().unwrap();
            assert!(matches!(item, Item::Unknown(_)));
            assert_eq!(item.kind(), "mcp_call");
        }
        other => panic!("Wrong event: {other:?}"),
    }
}

#[test]
fn test_function_call_output_serialization() {
    let event = ClientEvent::item_create(Item::function_call_output(
        "call_9",
        r#"{"response":"Tool call display_data executed successfully."}"#,
    ));
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["type"], "conversation.item.create");
    assert_eq!(value["item"]["type"], "function_call_output");
    assert_eq!(value["item"]["call_id"], "call_9");
    assert!(value.get("event_id").is_none());
    assert!(value.get("previous_item_id").is_none());
}

#[test]
fn test_control_events_serialization() {
    let value = serde_json::to_value(ClientEvent::response_create()).unwrap();
    assert_eq!(value, json!({"type": "response.create"}));

    let value = serde_json::to_value(ClientEvent::OutputAudioBufferClear { event_id: Some("e1".into()) }).unwrap();
    assert_eq!(value, json!({"type": "output_audio_buffer.clear", "event_id": "e1"}));

    let mut event = ClientEvent::ResponseCancel { event_id: None, response_id: None };
    event.ensure_event_id();
    let first = event.event_id().unwrap().to_string();
    event.ensure_event_id();
    assert_eq!(event.event_id(), Some(first.as_str()));
}

#[test]
fn test_session_update_shape() {
    let tools = ToolRegistry::whiteboard().try_as_tools().unwrap();
    let event = ClientEvent::session_update(SessionConfig::for_update("coral", "Teach.", tools));
    let value = serde_json::to_value(&event).unwrap();
    let session = &value["session"];

    assert_eq!(session["voice"], "coral");
    assert_eq!(session["instructions"], "Teach.");
    assert_eq!(session["input_audio_format"], "pcm16");
    assert_eq!(session["output_audio_format"], "pcm16");
    assert_eq!(session["input_audio_transcription"]["model"], "whisper-1");
    assert_eq!(session["turn_detection"]["type"], "server_vad");
    assert_eq!(session["turn_detection"]["prefix_padding_ms"], 300);
    assert_eq!(session["turn_detection"]["silence_duration_ms"], 200);
    assert_eq!(session["tools"][0]["type"], "function");
    assert_eq!(session["tools"][0]["name"], "display_content");
    assert!(session.get("model").is_none());
}

#[test]
fn test_session_token_secret() {
    let token: SessionToken = serde_json::from_value(json!({
        "id": "sess_1",
        "object": "realtime.session",
        "client_secret": {"value": "ek_abc", "expires_at": 1_700_000_000}
    }))
    .unwrap();
    assert_eq!(token.secret().unwrap(), "ek_abc");

    let token: SessionToken = serde_json::from_value(json!({"id": "sess_2"})).unwrap();
    assert!(token.secret().is_err());
}
