// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generator flows against a mocked Gemini endpoint.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use vidra_config::model::GeminiConfig;
use vidra_core::{
    AdapterHealth, GenerationMode, GenerationParams, GeneratorAdapter, ImageInput, PluginAdapter,
    ProgressFn, Resolution, VidraError, classify,
};
use vidra_core::classify::ErrorKind;
use vidra_gemini::{GeminiGenerator, STAGE_ANIMATING, STAGE_PREPARING};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VIDEO_MODEL: &str = "veo-test";

fn generator(server: &MockServer, max_poll_attempts: u32) -> GeminiGenerator {
    let config = GeminiConfig {
        api_key: Some("test-key".into()),
        base_url: server.uri(),
        video_model: VIDEO_MODEL.into(),
        image_model: "image-test".into(),
        max_poll_attempts,
        ..GeminiConfig::default()
    };
    GeminiGenerator::new(&config)
        .unwrap()
        .with_poll_interval(Duration::from_millis(5))
}

fn params(prompt: &str) -> GenerationParams {
    GenerationParams::text(prompt, VIDEO_MODEL)
}

async fn mount_submit(server: &MockServer, op_name: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/models/{VIDEO_MODEL}:predictLongRunning")))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": op_name})))
        .mount(server)
        .await;
}

async fn mount_done(server: &MockServer, op_name: &str, video_uri: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/{op_name}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": op_name,
            "done": true,
            "response": {
                "generateVideoResponse": {
                    "generatedSamples": [{"video": {"uri": video_uri}}]
                }
            }
        })))
        .mount(server)
        .await;
}

async fn mount_video(server: &MockServer, file: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{file}")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "video/mp4")
                .set_body_bytes(body.to_vec()),
        )
        .mount(server)
        .await;
}

async fn mount_image(server: &MockServer, data_b64: &str) {
    Mock::given(method("POST"))
        .and(path("/models/image-test:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": data_b64}}]}
            }]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn video_is_polled_until_done_then_downloaded() {
    let server = MockServer::start().await;
    mount_submit(&server, "operations/op-1").await;
    Mock::given(method("GET"))
        .and(path("/operations/op-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"name": "operations/op-1"})),
        )
        .up_to_n_times(2)
        .mount(&server)
        .await;
    let uri = format!("{}/files/v1", server.uri());
    mount_done(&server, "operations/op-1", &uri).await;
    mount_video(&server, "v1", b"VIDEO").await;

    let media = generator(&server, 10)
        .generate_video(&params("a lighthouse at dusk"))
        .await
        .unwrap();

    assert_eq!(media.url, uri);
    assert_eq!(media.blob, b"VIDEO");
    assert_eq!(media.mime_type, "video/mp4");

    let polls = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/operations/op-1")
        .count();
    assert_eq!(polls, 3);
}

#[tokio::test]
async fn submit_carries_aspect_ratio_resolution_and_start_frame() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/models/{VIDEO_MODEL}:predictLongRunning")))
        .and(body_partial_json(json!({
            "instances": [{
                "prompt": "waves",
                "image": {"bytesBase64Encoded": "YWJj", "mimeType": "image/png"}
            }],
            "parameters": {"aspectRatio": "16:9", "resolution": "1080p"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "operations/op-2"})))
        .mount(&server)
        .await;
    let uri = format!("{}/files/v2", server.uri());
    mount_done(&server, "operations/op-2", &uri).await;
    mount_video(&server, "v2", b"V2").await;

    let request = params("waves")
        .with_mode(GenerationMode::FramesToVideo)
        .with_resolution(Resolution::P1080)
        .with_start_frame(ImageInput::new(b"abc".to_vec(), "image/png"));

    let media = generator(&server, 3).generate_video(&request).await.unwrap();
    assert_eq!(media.blob, b"V2");
}

#[tokio::test]
async fn submit_error_body_is_classifiable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/models/{VIDEO_MODEL}:predictLongRunning")))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"code": 401, "message": "API key not valid", "status": "UNAUTHENTICATED"}
        })))
        .mount(&server)
        .await;

    let err = generator(&server, 3)
        .generate_video(&params("x"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "401 UNAUTHENTICATED: API key not valid");
    assert_eq!(classify(&err.to_string()).kind, ErrorKind::Unauthorized);
}

#[tokio::test]
async fn operation_error_surfaces_status_name() {
    let server = MockServer::start().await;
    mount_submit(&server, "operations/op-3").await;
    Mock::given(method("GET"))
        .and(path("/operations/op-3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "operations/op-3",
            "done": true,
            "error": {"code": 8, "message": "quota exceeded"}
        })))
        .mount(&server)
        .await;

    let err = generator(&server, 3)
        .generate_video(&params("x"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "8 RESOURCE_EXHAUSTED: quota exceeded");
    assert_eq!(classify(&err.to_string()).kind, ErrorKind::QuotaExceeded);
}

#[tokio::test]
async fn filtered_result_reads_as_safety_block() {
    let server = MockServer::start().await;
    mount_submit(&server, "operations/op-4").await;
    Mock::given(method("GET"))
        .and(path("/operations/op-4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "operations/op-4",
            "done": true,
            "response": {"generateVideoResponse": {
                "raiMediaFilteredReasons": ["contains a real person"]
            }}
        })))
        .mount(&server)
        .await;

    let err = generator(&server, 3)
        .generate_video(&params("x"))
        .await
        .unwrap_err();
    assert_eq!(classify(&err.to_string()).kind, ErrorKind::SafetyBlocked);
}

#[tokio::test]
async fn unfinished_operation_times_out_after_budget() {
    let server = MockServer::start().await;
    mount_submit(&server, "operations/slow").await;
    Mock::given(method("GET"))
        .and(path("/operations/slow"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"name": "operations/slow"})),
        )
        .mount(&server)
        .await;

    let err = generator(&server, 2)
        .generate_video(&params("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, VidraError::Timeout { .. }), "got {err:?}");

    let polls = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/operations/slow")
        .count();
    assert_eq!(polls, 2);
}

#[tokio::test]
async fn edit_image_returns_first_inline_image() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/image-test:generateContent"))
        .and(body_partial_json(json!({
            "contents": [{"parts": [
                {"inlineData": {"mimeType": "image/jpeg", "data": "YWJj"}},
                {"text": "make it snow"}
            ]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [
                {"text": "done"},
                {"inlineData": {"mimeType": "image/png", "data": "ZWRpdGVk"}}
            ]}}]
        })))
        .mount(&server)
        .await;

    let edited = generator(&server, 3)
        .edit_image(&ImageInput::new(b"abc".to_vec(), "image/jpeg"), "make it snow")
        .await
        .unwrap();
    assert_eq!(edited.data, b"edited");
    assert_eq!(edited.mime_type, "image/png");
}

#[tokio::test]
async fn text_only_image_response_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/image-test:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"parts": [{"text": "I can't do that"}]},
                "finishReason": "IMAGE_SAFETY"
            }]
        })))
        .mount(&server)
        .await;

    let err = generator(&server, 3)
        .generate_preview(&params("a forest"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("IMAGE_SAFETY"));
    assert_eq!(classify(&err.to_string()).kind, ErrorKind::SafetyBlocked);
}

#[tokio::test]
async fn character_replacement_edits_then_animates_with_progress() {
    let server = MockServer::start().await;
    mount_image(&server, "c3dhcHBlZA==").await;
    Mock::given(method("POST"))
        .and(path(format!("/models/{VIDEO_MODEL}:predictLongRunning")))
        .and(body_partial_json(json!({
            "instances": [{"image": {"bytesBase64Encoded": "c3dhcHBlZA=="}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "operations/cr"})))
        .mount(&server)
        .await;
    let uri = format!("{}/files/cr", server.uri());
    mount_done(&server, "operations/cr", &uri).await;
    mount_video(&server, "cr", b"CR").await;

    let mut request = params("keep the dance").with_mode(GenerationMode::CharacterReplacement);
    request.start_frame = Some(ImageInput::new(b"scene".to_vec(), "image/png"));
    request.character_image = Some(ImageInput::new(b"hero".to_vec(), "image/png"));

    let stages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&stages);
    let on_progress: ProgressFn = Arc::new(move |s: &str| sink.lock().unwrap().push(s.to_string()));

    let media = generator(&server, 3)
        .generate_character_replacement(&request, on_progress)
        .await
        .unwrap();

    assert_eq!(media.blob, b"CR");
    assert_eq!(
        *stages.lock().unwrap(),
        vec![STAGE_PREPARING.to_string(), STAGE_ANIMATING.to_string()]
    );
}

#[tokio::test]
async fn character_replacement_without_character_is_bad_request() {
    let server = MockServer::start().await;
    let request = params("x")
        .with_mode(GenerationMode::CharacterReplacement)
        .with_start_frame(ImageInput::new(b"scene".to_vec(), "image/png"));
    let on_progress: ProgressFn = Arc::new(|_: &str| {});

    let err = generator(&server, 3)
        .generate_character_replacement(&request, on_progress)
        .await
        .unwrap_err();
    assert_eq!(classify(&err.to_string()).kind, ErrorKind::BadRequest);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn health_reflects_key_presence() {
    let server = MockServer::start().await;
    let config = GeminiConfig {
        api_key: None,
        base_url: server.uri(),
        ..GeminiConfig::default()
    };
    let generator = GeminiGenerator::new(&config).unwrap();
    assert!(matches!(
        generator.health_check().await.unwrap(),
        AdapterHealth::Degraded(_)
    ));

    generator.client().set_api_key("new-key");
    assert_eq!(generator.health_check().await.unwrap(), AdapterHealth::Healthy);
}
