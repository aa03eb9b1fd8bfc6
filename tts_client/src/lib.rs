use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use reqwest::{
    blocking::{Client, Response},
    header::{self, HeaderMap, HeaderName, HeaderValue},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use tts_core::{wav, Result, SpeechSource, TtsError, Waveform};

/// `speech_generation` section of the configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    pub tts_url: String,
    /// Header that carries the API credential.
    pub token_header_key: String,
    /// Environment variable the credential is read from.
    pub token_variable_name: String,
    /// Requested output rate, sent as the `sample-rate` header. The API may
    /// ignore it; the decoded audio reports the real rate.
    pub sample_rate: u32,
    pub content_type: String,
    /// Request timeout. No timeout when unset.
    pub timeout_secs: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            tts_url: "https://65n1fnjut7.execute-api.eu-west-1.amazonaws.com/dev/v1/tts-api-manager"
                .to_string(),
            token_header_key: "x-api-key".to_string(),
            token_variable_name: "TTS_TOKEN".to_string(),
            sample_rate: 16000,
            content_type: "application/json".to_string(),
            timeout_secs: None,
        }
    }
}

/// Body of the synthesis request
#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    as_url: bool,
    lang: &'a str,
}

/// Envelope of the synthesis response
#[derive(Deserialize)]
struct SynthesisResponse {
    audio: AudioPayload,
}

#[derive(Deserialize)]
struct AudioPayload {
    audio_data: String,
}

/// Blocking client for the remote synthesis API.
pub struct SynthesisClient {
    config: GenerationConfig,
    headers: HeaderMap,
    client: Client,
}

impl SynthesisClient {
    /// Create a new client. Without a credential the token header is still
    /// sent, with an empty value.
    pub fn new(config: GenerationConfig, credential: Option<String>) -> Result<Self> {
        let headers = build_headers(&config, credential.as_deref())?;
        let client = Client::builder()
            .timeout(config.timeout_secs.map(Duration::from_secs))
            .build()
            .map_err(|e| TtsError::Config(format!("failed to build http client: {e}")))?;
        info!(url = %config.tts_url, "speech generator ready");
        Ok(Self {
            config,
            headers,
            client,
        })
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// POST the synthesis request and return the successful raw response.
    pub fn send_request(&self, text: &str, language_symbol: &str) -> Result<Response> {
        let body = SynthesisRequest {
            text,
            as_url: false,
            lang: language_symbol,
        };

        let response = self
            .client
            .post(&self.config.tts_url)
            .headers(self.headers.clone())
            .json(&body)
            .send()
            .map_err(|e| TtsError::SynthesisRequest {
                message: format!("POST {} failed: {e}", self.config.tts_url),
                status: e.status().map(|s| s.as_u16()),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(TtsError::SynthesisRequest {
                message: format!(
                    "POST {} returned {status}: {}",
                    self.config.tts_url,
                    detail.chars().take(200).collect::<String>()
                ),
                status: Some(status.as_u16()),
            });
        }
        Ok(response)
    }

    /// Extract the audio bytes from a synthesis response.
    pub fn decode_response(response: Response) -> Result<Vec<u8>> {
        let body = response
            .bytes()
            .map_err(|e| TtsError::request(format!("failed to read response body: {e}")))?;
        decode_payload(&body)
    }

    pub fn read_audio_bytes(audio_bytes: &[u8]) -> Result<Waveform> {
        wav::decode_wav(audio_bytes)
    }

    pub fn generate_audio(&self, text: &str, language_symbol: &str) -> Result<Waveform> {
        if text.trim().is_empty() {
            return Err(TtsError::request("text must not be empty"));
        }
        let response = self.send_request(text, language_symbol)?;
        let audio_bytes = Self::decode_response(response)?;
        let waveform = Self::read_audio_bytes(&audio_bytes)?;
        debug!(
            bytes = audio_bytes.len(),
            sample_rate = waveform.sample_rate(),
            duration_secs = waveform.duration_secs(),
            "speech generated"
        );
        Ok(waveform)
    }
}

impl SpeechSource for SynthesisClient {
    fn generate(&self, text: &str, language_symbol: &str) -> Result<Waveform> {
        self.generate_audio(text, language_symbol)
    }
}

/// Parse a response body: not JSON is a request failure, JSON without a
/// valid `audio.audio_data` string is a decoding failure.
pub fn decode_payload(body: &[u8]) -> Result<Vec<u8>> {
    let json: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| TtsError::request(format!("response body is not valid JSON: {e}")))?;
    let envelope: SynthesisResponse = serde_json::from_value(json)
        .map_err(|e| TtsError::Decoding(format!("missing audio.audio_data: {e}")))?;
    general_purpose::STANDARD
        .decode(envelope.audio.audio_data.as_bytes())
        .map_err(|e| TtsError::Decoding(format!("audio_data is not valid base64: {e}")))
}

fn build_headers(config: &GenerationConfig, credential: Option<&str>) -> Result<HeaderMap> {
    let token_header = HeaderName::from_bytes(config.token_header_key.as_bytes()).map_err(|e| {
        TtsError::Config(format!(
            "invalid token header name '{}': {e}",
            config.token_header_key
        ))
    })?;

    let mut token = match credential {
        Some(value) => HeaderValue::from_str(value)
            .map_err(|e| TtsError::Config(format!("credential is not a valid header value: {e}")))?,
        None => {
            // TODO: fail fast here once it is settled whether the API ever
            // accepts anonymous requests.
            warn!(
                variable = %config.token_variable_name,
                "no API credential provided, sending an empty {} header",
                config.token_header_key
            );
            HeaderValue::from_static("")
        }
    };
    token.set_sensitive(true);

    let content_type = HeaderValue::from_str(&config.content_type).map_err(|e| {
        TtsError::Config(format!("invalid content type '{}': {e}", config.content_type))
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(token_header, token);
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(
        HeaderName::from_static("sample-rate"),
        HeaderValue::from(config.sample_rate),
    );
    Ok(headers)
}
