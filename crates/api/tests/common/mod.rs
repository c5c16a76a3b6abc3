#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use roster_api::config::ServerConfig;
use roster_api::router::build_app_router;
use roster_api::state::AppState;
use roster_cdn::CdnConfig;
use roster_core::attachment::{UploadError, UploadPort};
use roster_core::profile::ImageContent;
use roster_core::service::ProfileService;
use roster_db::PgProfileStore;

const BOUNDARY: &str = "roster-test-boundary";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        max_body_bytes: 32 * 1024 * 1024,
        cdn: CdnConfig::new("http://cdn.test", "employee-profile", 5, 4),
    }
}

/// In-memory CDN that hands out predictable URLs.
#[derive(Default)]
pub struct FakeCdn {
    calls: AtomicUsize,
    fail: bool,
}

impl FakeCdn {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UploadPort for FakeCdn {
    async fn upload(&self, content: &ImageContent, resource: &str) -> Result<String, UploadError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail {
            return Err(UploadError::Rejected {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(format!("https://cdn.test/{resource}/{n}/{}", content.file_name))
    }
}

/// Build the full application router with a fresh fake CDN.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, Arc::new(FakeCdn::default()))
}

/// Build the full application router, uploading through `cdn`.
///
/// Uses the same middleware stack as `main.rs`.
pub fn build_test_app_with(pool: PgPool, cdn: Arc<FakeCdn>) -> Router {
    let config = test_config();
    let profiles = ProfileService::new(
        Arc::new(PgProfileStore::new(pool.clone())),
        cdn,
        config.cdn.resolver_settings(),
    );
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        profiles,
    };
    build_app_router(state, &config)
}

/// A file part of a multipart request.
pub struct FilePart<'a> {
    pub field: &'a str,
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub bytes: &'a [u8],
}

impl<'a> FilePart<'a> {
    pub fn png(field: &'a str) -> Self {
        Self {
            field,
            file_name: "photo.png",
            content_type: "image/png",
            bytes: b"\x89PNG\r\n\x1a\nfake",
        }
    }
}

/// Encode a `profile` JSON part plus file parts as `multipart/form-data`.
pub fn multipart_body(profile: Option<&serde_json::Value>, files: &[FilePart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(profile) = profile {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"profile\"\r\n\
                 Content-Type: application/json\r\n\r\n{profile}\r\n"
            )
            .as_bytes(),
        );
    }
    for file in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                 Content-Type: {}\r\n\r\n",
                file.field, file.file_name, file.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Send a multipart request.
pub async fn send_multipart(
    app: Router,
    method: Method,
    uri: &str,
    profile: Option<&serde_json::Value>,
    files: &[FilePart<'_>],
) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(profile, files)))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_profile(
    app: Router,
    profile: &serde_json::Value,
    files: &[FilePart<'_>],
) -> Response {
    send_multipart(app, Method::POST, "/api/v1/employees", Some(profile), files).await
}

pub async fn put_profile(
    app: Router,
    id: i64,
    profile: &serde_json::Value,
    files: &[FilePart<'_>],
) -> Response {
    send_multipart(
        app,
        Method::PUT,
        &format!("/api/v1/employees/{id}"),
        Some(profile),
        files,
    )
    .await
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn delete(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Look up a seeded role id and one of its tool ids by name.
pub async fn resource_ids(pool: &PgPool, role: &str, tool: &str) -> (i64, i64) {
    sqlx::query_as(
        "SELECT pr.id, tr.id FROM position_resources pr
         JOIN tool_language_resources tr ON tr.position_resource_id = pr.id
         WHERE pr.name = $1 AND tr.name = $2",
    )
    .bind(role)
    .bind(tool)
    .fetch_one(pool)
    .await
    .unwrap()
}
