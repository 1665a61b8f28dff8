use serde::{Deserialize, Serialize};

use super::{AudioFormat, InputAudioTranscription, Modality, Tool, TurnDetection, Voice};

/// Session settings shared by upstream session creation and `session.update`.
///
/// `model` is only meaningful when creating a session; it is omitted from updates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<Modality>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<Voice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_format: Option<AudioFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_format: Option<AudioFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<InputAudioTranscription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
}

impl SessionConfig {
    /// Settings used when creating the ephemeral session upstream.
    #[must_use]
    pub fn for_creation(
        model: impl Into<String>,
        voice: impl Into<Voice>,
        instructions: impl Into<String>,
        tools: Vec<Tool>,
    ) -> Self {
        Self {
            model: Some(model.into()),
            modalities: Some(vec![Modality::Text, Modality::Audio]),
            instructions: Some(instructions.into()),
            voice: Some(voice.into()),
            tools: Some(tools),
            ..Self::default()
        }
    }

    /// Settings sent once over the data channel after it opens.
    #[must_use]
    pub fn for_update(
        voice: impl Into<Voice>,
        instructions: impl Into<String>,
        tools: Vec<Tool>,
    ) -> Self {
        Self {
            model: None,
            modalities: None,
            instructions: Some(instructions.into()),
            voice: Some(voice.into()),
            input_audio_format: Some(AudioFormat::Pcm16),
            output_audio_format: Some(AudioFormat::Pcm16),
            input_audio_transcription: Some(InputAudioTranscription::default()),
            turn_detection: Some(TurnDetection::lecture()),
            tools: Some(tools),
        }
    }
}

/// Client secret minted for browser/peer use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientSecret {
    pub value: String,
    pub expires_at: Option<u64>,
}

/// Ephemeral session returned by the session endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionToken {
    pub id: Option<String>,
    pub client_secret: Option<ClientSecret>,
}

impl SessionToken {
    /// The bearer value used for the SDP exchange.
    ///
    /// # Errors
    /// Returns `SessionToken` when the credential is missing or empty.
    #[allow(clippy::result_large_err)]
    pub fn secret(&self) -> crate::Result<&str> {
        self.client_secret
            .as_ref()
            .map(|secret| secret.value.as_str())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| crate::Error::SessionToken("Invalid session response".to_string()))
    }
}
