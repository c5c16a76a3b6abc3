//! CDN client tests against an in-process axum server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use roster_cdn::{CdnClient, CdnConfig, CdnError};
use roster_core::attachment::{UploadError, UploadPort};
use roster_core::profile::ImageContent;

/// What the fake CDN saw for one upload.
#[derive(Debug, Clone)]
struct Received {
    resource: Option<String>,
    field: String,
    file_name: Option<String>,
    content_type: Option<String>,
    len: usize,
}

#[derive(Clone)]
struct FakeCdn {
    received: Arc<Mutex<Vec<Received>>>,
    status: StatusCode,
    body: Value,
}

async fn upload(
    State(cdn): State<FakeCdn>,
    Query(query): Query<HashMap<String, String>>,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    while let Some(field) = multipart.next_field().await.unwrap() {
        let record = Received {
            resource: query.get("resource").cloned(),
            field: field.name().unwrap_or_default().to_string(),
            file_name: field.file_name().map(str::to_string),
            content_type: field.content_type().map(str::to_string),
            len: 0,
        };
        let bytes = field.bytes().await.unwrap();
        cdn.received.lock().unwrap().push(Received {
            len: bytes.len(),
            ..record
        });
    }
    (cdn.status, Json(cdn.body.clone()))
}

/// Serve a fake CDN on an ephemeral port and return a client pointing at it.
async fn spawn_cdn(status: StatusCode, body: Value) -> (CdnClient, Arc<Mutex<Vec<Received>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/cdn/upload", post(upload))
        .with_state(FakeCdn {
            received: Arc::clone(&received),
            status,
            body,
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = CdnConfig::new(format!("http://{addr}/"), "employee-profile", 5, 4);
    (CdnClient::new(&config).unwrap(), received)
}

fn photo() -> ImageContent {
    ImageContent {
        bytes: vec![0x89, b'P', b'N', b'G', 1, 2, 3],
        content_type: "image/png".into(),
        file_name: "portrait.png".into(),
    }
}

#[tokio::test]
async fn upload_returns_url_from_data_field() {
    let (client, received) = spawn_cdn(
        StatusCode::OK,
        json!({"message": "OK", "data": "https://cdn.example/p/portrait.png", "ts": "2024-06-23T10:00:00Z"}),
    )
    .await;

    let url = client.upload(&photo(), "employee-profile").await.unwrap();

    assert_eq!(url, "https://cdn.example/p/portrait.png");
    let received = received.lock().unwrap().clone();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].resource.as_deref(), Some("employee-profile"));
    assert_eq!(received[0].field, "file");
    assert_eq!(received[0].file_name.as_deref(), Some("portrait.png"));
    assert_eq!(received[0].content_type.as_deref(), Some("image/png"));
    assert_eq!(received[0].len, 7);
}

#[tokio::test]
async fn nameless_file_gets_generated_name() {
    let (client, received) =
        spawn_cdn(StatusCode::OK, json!({"message": "OK", "data": "https://cdn.example/x"})).await;
    let mut content = photo();
    content.file_name = String::new();

    client.upload_file(&content, "employee-profile").await.unwrap();

    let name = received.lock().unwrap()[0].file_name.clone().unwrap_or_default();
    assert_eq!(name.len(), 36, "expected a uuid, got {name:?}");
}

#[tokio::test]
async fn error_status_is_rejected_with_body() {
    let (client, _) = spawn_cdn(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"message": "disk full"}),
    )
    .await;

    let err = client.upload_file(&photo(), "employee-profile").await.unwrap_err();
    match err {
        CdnError::ApiError { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("disk full"));
        }
        other => panic!("expected ApiError, got {other:?}"),
    }

    let err = client.upload(&photo(), "employee-profile").await.unwrap_err();
    assert!(matches!(err, UploadError::Rejected { status: 500, .. }));
}

#[tokio::test]
async fn success_without_url_is_missing_url() {
    let (client, _) = spawn_cdn(StatusCode::OK, json!({"message": "OK", "data": null})).await;

    let err = client.upload(&photo(), "employee-profile").await.unwrap_err();

    assert!(matches!(err, UploadError::MissingUrl));
}

#[tokio::test]
async fn unreachable_cdn_is_a_transport_error() {
    // Bind then drop a listener to get a port nobody is serving.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = CdnClient::new(&CdnConfig::new(format!("http://{addr}"), "r", 2, 1)).unwrap();

    let err = client.upload(&photo(), "r").await.unwrap_err();

    assert!(matches!(err, UploadError::Transport(_)));
}
