#![cfg(feature = "server")]

use actix_web::{http::StatusCode, test, web, App};
use image::{DynamicImage, ImageFormat, RgbImage};
use prompt2image::{
    server::{self, AppState},
    Config, InferenceClient, ScriptedTransport, TransportError, TransportResponse,
};
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::Arc;

type Outcome = Result<TransportResponse, TransportError>;

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([200, 80, 20])));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn image_ok() -> Outcome {
    Ok(TransportResponse::image(png(512, 512)))
}

async fn state(dir: &tempfile::TempDir, script: Vec<Outcome>, rate_limit: u32) -> AppState {
    let config = Config::new()
        .with_token("hf_test")
        .with_output_dir(dir.path())
        .with_inference_base_url("http://inference.test/models")
        .with_rate_limit(rate_limit);
    let transport = Arc::new(ScriptedTransport::new(script));
    let client = InferenceClient::new(transport, &config);
    AppState::new(config, client).await.unwrap()
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .configure(server::configure),
        )
        .await
    };
}

#[actix_web::test]
async fn root_lists_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(state(&dir, vec![], 10).await);

    let body: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert!(body.get("message").is_some());
    assert!(body["endpoints"].get("generate").is_some());
}

#[actix_web::test]
async fn health_and_models() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(state(&dir, vec![], 10).await);

    let health: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/health").to_request(),
    )
    .await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["huggingface_configured"], true);

    let models: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/models").to_request(),
    )
    .await;
    assert_eq!(models["models"].as_array().unwrap().len(), 5);
    assert_eq!(models["default"], "stable-diffusion-xl");
}

#[actix_web::test]
async fn config_summary_hides_token() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(state(&dir, vec![], 10).await);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/config").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let raw = test::read_body(resp).await;
    let text = String::from_utf8(raw.to_vec()).unwrap();
    assert!(!text.contains("hf_test"));

    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["huggingface_configured"], true);
    assert_eq!(body["default_image_size"], "512x512");
}

#[actix_web::test]
async fn generate_then_fetch_list_and_delete() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(state(&dir, vec![image_ok()], 10).await);

    let req = test::TestRequest::post()
        .uri("/generate")
        .set_json(json!({ "prompt": "A beautiful sunset over mountains" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["success"], true);
    assert_eq!(body["prompt"], "A beautiful sunset over mountains");
    let filename = body["filename"].as_str().unwrap().to_string();
    assert!(filename.ends_with(".png"));
    assert!(filename.contains("sunset"));
    assert_eq!(body["image_url"], format!("/output/{}", filename));

    for uri in [format!("/image/{}", filename), format!("/output/{}", filename)] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("content-type").unwrap(), "image/png");
    }

    let gallery: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/gallery").to_request(),
    )
    .await;
    assert_eq!(gallery["success"], true);
    assert_eq!(gallery["count"], 1);
    assert_eq!(gallery["images"][0]["filename"], filename.as_str());

    let stats: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/stats").to_request(),
    )
    .await;
    assert_eq!(stats["total_images"], 1);
    assert!(stats.get("total_size_mb").is_some());
    assert!(stats.get("average_size_mb").is_some());

    let resp = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/image/{}", filename))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(!dir.path().join(&filename).exists());

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/image/{}", filename))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn generate_rejects_bad_input() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(state(&dir, vec![image_ok()], 10).await);

    for body in [
        json!({ "prompt": "" }),
        json!({ "prompt": "a cat", "width": 0 }),
        json!({ "prompt": "a cat", "width": 4096 }),
        json!({ "prompt": "a cat", "num_inference_steps": 500 }),
        json!({ "width": 512 }),
    ] {
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/generate")
                .set_json(&body)
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY, "{}", body);
        let err: Value = test::read_body_json(resp).await;
        assert_eq!(err["success"], false);
    }
}

#[actix_web::test]
async fn generate_failure_is_a_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let script = vec![Ok(TransportResponse::json(401, "Invalid credentials"))];
    let app = app!(state(&dir, script, 10).await);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/generate")
            .set_json(json!({ "prompt": "a cat" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let err: Value = test::read_body_json(resp).await;
    assert_eq!(err["success"], false);
    assert!(err["error"].as_str().unwrap().contains("401"));
}

#[actix_web::test]
async fn invalid_output_is_not_stored() {
    let dir = tempfile::tempdir().unwrap();
    let script = vec![Ok(TransportResponse::image(png(10, 10)))];
    let app = app!(state(&dir, script, 10).await);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/generate")
            .set_json(json!({ "prompt": "a cat" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let stats: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/stats").to_request(),
    )
    .await;
    assert_eq!(stats["total_images"], 0);
}

#[actix_web::test]
async fn generate_is_rate_limited() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(state(&dir, vec![image_ok(), image_ok()], 1).await);

    let first = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/generate")
            .set_json(json!({ "prompt": "first" }))
            .to_request(),
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/generate")
            .set_json(json!({ "prompt": "second" }))
            .to_request(),
    )
    .await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[actix_web::test]
async fn delete_unknown_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(state(&dir, vec![], 10).await);

    for uri in ["/image/missing.png", "/image/..%2Fsecret.png"] {
        let resp =
            test::call_service(&app, test::TestRequest::delete().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}
