//! Helpers for driving the router in tests

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::jwt::{JwtConfig, JwtService};
use serde_json::Value;
use std::{io::Cursor, path::PathBuf, sync::Arc};
use tower::ServiceExt;
use uuid::Uuid;

use super::create_router;
use crate::{repositories::InMemoryRecipeRepository, state::AppState, storage::MediaStorage};

const BOUNDARY: &str = "recipe-test-boundary";

/// Router state over an in-memory repository and a scratch media directory
pub struct TestApp {
    pub state: AppState,
    pub media_root: PathBuf,
    pub user: Uuid,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let media_root = std::env::temp_dir().join(format!("recipe-api-test-{}", Uuid::new_v4()));
        let state = AppState {
            recipes: Arc::new(InMemoryRecipeRepository::new()),
            jwt_service: JwtService::new(JwtConfig {
                secret: "api-test-secret".to_string(),
                access_token_expiry: 900,
            }),
            media: MediaStorage::new(&media_root),
        };

        let user = Uuid::new_v4();
        let mut app = Self {
            state,
            media_root,
            user,
            token: String::new(),
        };
        app.token = app.token_for(user);
        app
    }

    pub fn token_for(&self, user: Uuid) -> String {
        self.state
            .jwt_service
            .generate_access_token(user, &format!("{}@example.com", user.simple()), false)
            .unwrap()
    }

    pub fn auth(&self) -> Option<&str> {
        Some(self.token.as_str())
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = create_router(self.state.clone())
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.media_root);
    }
}

fn with_auth(
    builder: axum::http::request::Builder,
    token: Option<&str>,
) -> axum::http::request::Builder {
    match token {
        Some(token) => builder.header("authorization", format!("Bearer {}", token)),
        None => builder,
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    with_auth(Request::get(uri), token)
        .body(Body::empty())
        .unwrap()
}

pub fn delete(uri: &str, token: Option<&str>) -> Request<Body> {
    with_auth(Request::delete(uri), token)
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    with_auth(Request::builder().method(method).uri(uri), token)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Single-part multipart/form-data request
pub fn multipart_request(
    uri: &str,
    token: Option<&str>,
    field: &str,
    filename: &str,
    content: &[u8],
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    with_auth(Request::post(uri), token)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// A small valid PNG
pub fn png_bytes() -> Vec<u8> {
    let image = image::RgbImage::from_pixel(10, 10, image::Rgb([200, 120, 40]));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, image::ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}
