pub mod common;
pub mod items;
pub mod response;
pub mod session;
pub mod tools;

pub use common::{
    ArbitraryJson, AudioFormat, DEFAULT_MODEL, DEFAULT_VOICE, InputAudioTranscription, ItemStatus,
    JsonSchema, Modality, Role, TurnDetection, Voice,
};
pub use items::{ContentPart, Item};
pub use response::{Response, ResponseStatus};
pub use session::{ClientSecret, SessionConfig, SessionToken};
pub use tools::Tool;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_item_is_preserved() {
        let raw = serde_json::json!({"type": "mcp_call", "id": "item_9"});
        let item: Item = serde_json::from_value(raw.clone()).unwrap();
        assert!(matches!(item, Item::Unknown(_)));
        assert_eq!(item.kind(), "mcp_call");
        assert_eq!(serde_json::to_value(&item).unwrap(), raw);
    }

    #[test]
    fn function_call_output_omits_missing_id() {
        let item = Item::function_call_output("call_1", "{}");
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "function_call_output", "call_id": "call_1", "output": "{}"})
        );
    }

    #[test]
    fn session_update_uses_lecture_defaults() {
        let config = SessionConfig::for_update(DEFAULT_VOICE, "Teach.", Vec::new());
        let value = serde_json::to_value(&config).unwrap();
        assert!(value.get("model").is_none());
        assert_eq!(value["voice"], "coral");
        assert_eq!(value["input_audio_format"], "pcm16");
        assert_eq!(value["output_audio_format"], "pcm16");
        assert_eq!(value["input_audio_transcription"]["model"], "whisper-1");
        assert_eq!(value["turn_detection"]["type"], "server_vad");
        assert_eq!(value["turn_detection"]["prefix_padding_ms"], 300);
        assert_eq!(value["turn_detection"]["silence_duration_ms"], 200);
    }

    #[test]
    fn session_token_requires_secret_value() {
        let token: SessionToken = serde_json::from_value(serde_json::json!({"id": "sess_1"})).unwrap();
        assert!(matches!(token.secret(), Err(crate::Error::SessionToken(_))));

        let token: SessionToken = serde_json::from_value(serde_json::json!({
            "id": "sess_1",
            "client_secret": {"value": "ek_123", "expires_at": 1}
        }))
        .unwrap();
        assert_eq!(token.secret().unwrap(), "ek_123");
    }
}
