//! Integration tests for the synthesis client against a local fake API

use std::{
    io::Cursor,
    net::SocketAddr,
    sync::{mpsc, Arc, Mutex},
    thread,
};

use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
use base64::{engine::general_purpose, Engine as _};
use serde_json::{json, Value};
use tts_client::{GenerationConfig, SynthesisClient};
use tts_core::{SpeechSource, TtsError};

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<(HeaderMap, Value)>>>);

/// Serve `router` on an ephemeral port from a background runtime.
fn spawn_api(router: Router) -> SocketAddr {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            axum::serve(listener, router).await.unwrap();
        });
    });
    rx.recv().unwrap()
}

fn wav_bytes(samples: &[i16], sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
    cursor.into_inner()
}

/// Fake API answering every request with `reply` and recording what it saw.
fn fake_api(status: StatusCode, reply: String) -> (String, Captured) {
    let captured = Captured::default();
    let router = Router::new()
        .route(
            "/tts",
            post(
                move |State(seen): State<Captured>, headers: HeaderMap, Json(body): Json<Value>| {
                    let reply = reply.clone();
                    async move {
                        seen.0.lock().unwrap().push((headers, body));
                        (status, reply)
                    }
                },
            ),
        )
        .with_state(captured.clone());
    let addr = spawn_api(router);
    (format!("http://{addr}/tts"), captured)
}

fn client_for(url: String, credential: Option<&str>) -> SynthesisClient {
    let config = GenerationConfig {
        tts_url: url,
        sample_rate: 22050,
        ..GenerationConfig::default()
    };
    SynthesisClient::new(config, credential.map(str::to_string)).unwrap()
}

#[test]
fn test_generate_audio_round_trip() {
    let audio = wav_bytes(&[0, 8192, -8192, 16384], 16000);
    let reply = json!({"audio": {"audio_data": general_purpose::STANDARD.encode(&audio)}});
    let (url, captured) = fake_api(StatusCode::OK, reply.to_string());

    let client = client_for(url, Some("secret-token"));
    let waveform = client.generate("Hallo Welt", "de").unwrap();

    assert_eq!(waveform.sample_rate(), 16000);
    assert_eq!(waveform.to_mono(), vec![0.0, 0.25, -0.25, 0.5]);

    let seen = captured.0.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (headers, body) = &seen[0];
    assert_eq!(body, &json!({"text": "Hallo Welt", "as_url": false, "lang": "de"}));
    assert_eq!(headers["x-api-key"], "secret-token");
    assert_eq!(headers["content-type"], "application/json");
    assert_eq!(headers["sample-rate"], "22050");
}

#[test]
fn test_missing_credential_sends_empty_header() {
    let audio = wav_bytes(&[0; 16], 16000);
    let reply = json!({"audio": {"audio_data": general_purpose::STANDARD.encode(&audio)}});
    let (url, captured) = fake_api(StatusCode::OK, reply.to_string());

    let client = client_for(url, None);
    client.generate_audio("hello", "en").unwrap();

    let seen = captured.0.lock().unwrap();
    assert_eq!(seen[0].0["x-api-key"], "");
}

#[test]
fn test_http_error_status_is_request_error() {
    let (url, _) = fake_api(StatusCode::FORBIDDEN, r#"{"message": "Forbidden"}"#.to_string());
    let err = client_for(url, Some("wrong")).generate_audio("hello", "en").unwrap_err();
    match err {
        TtsError::SynthesisRequest { status, message } => {
            assert_eq!(status, Some(403));
            assert!(message.contains("Forbidden"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_audio_data_is_decoding_error() {
    let (url, _) = fake_api(StatusCode::OK, r#"{"audio": {"url": "https://cdn/x.wav"}}"#.into());
    let err = client_for(url, Some("t")).generate_audio("hello", "en").unwrap_err();
    assert!(matches!(err, TtsError::Decoding(_)), "{err}");
}

#[test]
fn test_non_json_body_is_request_error() {
    let (url, _) = fake_api(StatusCode::OK, "plain text".into());
    let err = client_for(url, Some("t")).generate_audio("hello", "en").unwrap_err();
    assert!(matches!(err, TtsError::SynthesisRequest { .. }), "{err}");
}

#[test]
fn test_corrupt_audio_is_audio_format_error() {
    let reply = json!({"audio": {"audio_data": general_purpose::STANDARD.encode(b"ID3 mp3 bytes")}});
    let (url, _) = fake_api(StatusCode::OK, reply.to_string());
    let err = client_for(url, Some("t")).generate_audio("hello", "en").unwrap_err();
    assert!(matches!(err, TtsError::AudioFormat(_)), "{err}");
}

#[test]
fn test_empty_text_is_rejected_before_sending() {
    let (url, captured) = fake_api(StatusCode::OK, "{}".into());
    let err = client_for(url, Some("t")).generate_audio("   ", "en").unwrap_err();
    assert!(matches!(err, TtsError::SynthesisRequest { status: None, .. }));
    assert!(captured.0.lock().unwrap().is_empty());
}

#[test]
fn test_unreachable_api_is_request_error() {
    // Bind and drop to get a port nobody listens on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let err = client_for(format!("http://{addr}/tts"), Some("t"))
        .generate_audio("hello", "en")
        .unwrap_err();
    assert!(matches!(err, TtsError::SynthesisRequest { .. }));
}
