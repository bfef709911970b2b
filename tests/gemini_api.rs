//! End-to-end tests against a mocked Gemini API.

use base64::Engine;
use fashionforge::{
    ContentGenerator, ErrorKind, GeminiClient, GeminiModel, GenerationOutcome, TryOnGenerator,
    UploadedImage, TRY_ON_PROMPT,
};
use fashionforge::tryon::{ContentRequest, Part};
use image::{DynamicImage, Rgba, RgbaImage};
use serde_json::{json, Value};
use std::io::Cursor;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/v1beta/models/gemini-3-pro-image-preview:generateContent";

fn png(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| Rgba([shade, x as u8, y as u8, 255]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn b64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

fn generator(server: &MockServer) -> TryOnGenerator {
    TryOnGenerator::builder()
        .api_key("test-key")
        .base_url(server.uri())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_try_on_round_trip() {
    let server = MockServer::start().await;
    let result = png(8, 8, 200);

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "Here is the model wearing the garment."},
                        {"inlineData": {"mimeType": "image/png", "data": b64(&result)}}
                    ]
                },
                "finishReason": "STOP"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let person = UploadedImage::open(png(4, 6, 10)).unwrap();
    let garment = UploadedImage::open(png(5, 5, 90)).unwrap();

    let outcome = generator(&server)
        .generate(Some(&person), Some(&garment))
        .await;
    let image = outcome.into_image().expect("expected an image");
    assert_eq!(image.data, result);
    assert_eq!((image.width(), image.height()), (8, 8));
    assert_eq!(
        image.metadata.model.as_deref(),
        Some("gemini-3-pro-image-preview")
    );

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Value = requests[0].body_json().unwrap();
    let parts = body["contents"][0]["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
    assert_eq!(parts[0]["inlineData"]["data"], b64(&person.to_png().unwrap()));
    assert_eq!(parts[1]["inlineData"]["data"], b64(&garment.to_png().unwrap()));
    assert_eq!(parts[2]["text"], TRY_ON_PROMPT);
}

#[tokio::test]
async fn test_blocked_prompt_is_no_image_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        })))
        .mount(&server)
        .await;

    let image = UploadedImage::open(png(2, 2, 0)).unwrap();
    let outcome = generator(&server).generate(Some(&image), Some(&image)).await;

    match outcome {
        GenerationOutcome::Failure { kind, message } => {
            assert_eq!(kind, ErrorKind::NoImageReturned);
            assert_eq!(message, "No image generated from Gemini API");
        }
        GenerationOutcome::Success(_) => panic!("expected failure"),
    }
}

#[tokio::test]
async fn test_rejected_key_is_request_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let image = UploadedImage::open(png(2, 2, 0)).unwrap();
    let outcome = generator(&server).generate(Some(&image), Some(&image)).await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::Request));
    assert_eq!(
        outcome.error_message(),
        Some(concat!(
            "Error generating try-on: API error: 400 - ",
            "API key not valid. Please pass a valid API key."
        ))
    );
}

#[tokio::test]
async fn test_rate_limit_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "5"))
        .expect(1)
        .mount(&server)
        .await;

    let image = UploadedImage::open(png(2, 2, 0)).unwrap();
    let outcome = generator(&server).generate(Some(&image), Some(&image)).await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::Request));
    assert!(outcome.error_message().unwrap().contains("rate limited"));
}

#[tokio::test]
async fn test_timeout_is_request_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"candidates": []}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let generator = TryOnGenerator::builder()
        .api_key("test-key")
        .base_url(server.uri())
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();

    let image = UploadedImage::open(png(2, 2, 0)).unwrap();
    let outcome = generator.generate(Some(&image), Some(&image)).await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::Request));
    assert!(outcome
        .error_message()
        .unwrap()
        .starts_with("Error generating try-on: network error"));
}

#[tokio::test]
async fn test_missing_images_never_reach_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let image = UploadedImage::open(png(2, 2, 0)).unwrap();
    let generator = generator(&server);

    let outcome = generator.generate(None, Some(&image)).await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::MissingPerson));
    let outcome = generator.generate(Some(&image), None).await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::MissingGarment));
}

#[tokio::test]
async fn test_client_flash_model_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash-image:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "only text"}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GeminiClient::builder()
        .api_key("test-key")
        .model(GeminiModel::NanoBanana)
        .base_url(server.uri())
        .build()
        .unwrap();

    let request = ContentRequest::new().with_part(Part::text("hello"));
    let response = client.generate_content(&request).await.unwrap();
    assert_eq!(response.text(), "only text");
}

#[tokio::test]
async fn test_health_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models/gemini-3-pro-image-preview"))
        .and(header("x-goog-api-key", "good-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "models/gemini-3-pro-image-preview"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models/gemini-3-pro-image-preview"))
        .and(header("x-goog-api-key", "bad-key"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let good = TryOnGenerator::builder()
        .api_key("good-key")
        .base_url(server.uri())
        .build()
        .unwrap();
    assert!(good.health_check().await.is_ok());

    let bad = TryOnGenerator::builder()
        .api_key("bad-key")
        .base_url(server.uri())
        .build()
        .unwrap();
    let err = bad.health_check().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Request);
}
