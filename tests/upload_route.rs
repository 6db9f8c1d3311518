mod common;

use article_photo_kit::routes::{create_routes, AppState};
use article_photo_kit::services::pipeline::PhotoPipeline;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::*;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "photo-kit-test-boundary";

enum Part<'a> {
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: Vec<u8>,
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}").as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(article: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/article/{article}/uploadPhoto"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn app(root: &TempDir, store: Arc<InMemoryPhotoStore>) -> Router {
    let pipeline = PhotoPipeline::new(storage(root.path()), store);
    create_routes(AppState {
        pipeline: Arc::new(pipeline),
    })
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn jpeg_part(data: Vec<u8>) -> Part<'static> {
    Part::File {
        name: "photo",
        file_name: "my photo.jpg",
        content_type: "image/jpeg",
        data,
    }
}

#[tokio::test]
async fn upload_returns_stored_photo() {
    let root = TempDir::new().unwrap();
    let store = Arc::new(InMemoryPhotoStore::default());
    let request = upload_request(
        "7",
        &[
            Part::Text {
                name: "caption",
                value: "front view",
            },
            jpeg_part(jpeg_bytes(320, 240)),
        ],
    );

    let (status, body) = send(app(&root, store.clone()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["article_id"], 7);
    let image_path = body["image_path"].as_str().unwrap();
    assert!(image_path.ends_with("-my-photo.jpg"));
    assert!(root.path().join(image_path).is_file());
    assert!(root.path().join("thumb").join(image_path).is_file());
    assert!(root.path().join("small").join(image_path).is_file());
    assert_eq!(store.call_count(), 1);
}

#[tokio::test]
async fn non_numeric_article_id_is_malformed() {
    let root = TempDir::new().unwrap();
    let request = upload_request("abc", &[jpeg_part(jpeg_bytes(32, 32))]);

    let (status, body) = send(app(&root, Arc::default()), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], -4005);
}

#[tokio::test]
async fn form_without_file_is_rejected() {
    let root = TempDir::new().unwrap();
    let request = upload_request(
        "1",
        &[Part::Text {
            name: "caption",
            value: "nothing attached",
        }],
    );

    let (status, body) = send(app(&root, Arc::default()), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"status": "error", "code": -4002, "message": "File not uploaded"})
    );
}

#[tokio::test]
async fn two_files_are_rejected() {
    let root = TempDir::new().unwrap();
    let request = upload_request(
        "1",
        &[jpeg_part(jpeg_bytes(32, 32)), jpeg_part(jpeg_bytes(32, 32))],
    );

    let (status, body) = send(app(&root, Arc::default()), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], -4002);
    assert!(files_under(root.path()).is_empty());
}

#[tokio::test]
async fn disguised_executable_is_unsupported_media_type() {
    let root = TempDir::new().unwrap();
    let store = Arc::new(InMemoryPhotoStore::default());
    let request = upload_request(
        "7",
        &[Part::File {
            name: "file",
            file_name: "evil.png",
            content_type: "image/png",
            data: elf_bytes(),
        }],
    );

    let (status, body) = send(app(&root, store.clone()), request).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["code"], -4003);
    assert_eq!(store.call_count(), 0);
    assert!(files_under(root.path()).is_empty());
}

#[tokio::test]
async fn oversized_file_is_payload_too_large() {
    let root = TempDir::new().unwrap();
    let pipeline = PhotoPipeline::new(
        storage(root.path()).with_max_bytes(4 * 1024),
        Arc::new(InMemoryPhotoStore::default()),
    );
    let app = create_routes(AppState {
        pipeline: Arc::new(pipeline),
    });
    let mut data = png_bytes(16, 16);
    data.resize(4 * 1024 + 1, 0);
    let request = upload_request(
        "1",
        &[Part::File {
            name: "file",
            file_name: "big.png",
            content_type: "image/png",
            data,
        }],
    );

    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["code"], -4002);
    assert!(files_under(root.path()).is_empty());
}

#[tokio::test]
async fn non_multipart_body_is_malformed() {
    let root = TempDir::new().unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/api/article/1/uploadPhoto")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"file": "nope"}"#))
        .unwrap();

    let (status, body) = send(app(&root, Arc::default()), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], -4005);
}

#[tokio::test]
async fn unknown_article_is_not_found() {
    let root = TempDir::new().unwrap();
    let store = Arc::new(InMemoryPhotoStore::with_articles(&[1]));
    let request = upload_request("42", &[jpeg_part(jpeg_bytes(64, 64))]);

    let (status, body) = send(app(&root, store), request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], -4001);
    assert!(files_under(root.path()).is_empty());
}
