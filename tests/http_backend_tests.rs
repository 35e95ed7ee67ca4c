use axum::{
    Json, Router,
    extract::Path,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;
use vpc3tier::TierError;
use vpc3tier::cos::iam::IamTokenSource;
use vpc3tier::cos::{CosClient, ObjectStore};
use vpc3tier::service::remote::remote_get;

const TOKEN: &str = "test-token";
const TIMEOUT: Duration = Duration::from_secs(2);

fn authorized(headers: &HeaderMap) -> bool {
    let expected = format!("Bearer {TOKEN}");
    headers.get("authorization").and_then(|v| v.to_str().ok()) == Some(expected.as_str())
}

async fn iam_token() -> Json<Value> {
    Json(json!({ "access_token": TOKEN, "expires_in": 3600 }))
}

async fn bucket(Path(bucket): Path<String>, headers: HeaderMap) -> StatusCode {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    if bucket == "bucket-a" {
        StatusCode::OK
    } else {
        StatusCode::FORBIDDEN
    }
}

async fn object(
    Path((_bucket, key)): Path<(String, String)>,
    headers: HeaderMap,
) -> (StatusCode, String) {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, String::new());
    }
    match key.as_str() {
        "present" => (StatusCode::OK, r#"{"count": 3}"#.to_string()),
        "locked" => (StatusCode::FORBIDDEN, String::new()),
        _ => (StatusCode::NOT_FOUND, String::new()),
    }
}

/// Peer tier, IAM token endpoint and object storage on one local listener.
async fn serve() -> SocketAddr {
    let app = Router::new()
        .route("/peer/increment", get(|| async { Json(json!({ "count": 7 })) }))
        .route("/plain/increment", get(|| async { "plain body" }))
        .route("/iam/token", post(iam_token))
        .route("/cos/{bucket}", get(bucket))
        .route("/cos/{bucket}/{key}", get(object));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// An address nothing is listening on.
async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

fn cos_client(addr: SocketAddr, bucket: &str) -> CosClient {
    let http = reqwest::Client::new();
    let tokens = IamTokenSource::new(
        http.clone(),
        Url::parse(&format!("http://{addr}/iam/token")).unwrap(),
        "api-key",
    );
    CosClient::new(
        http,
        Url::parse(&format!("http://{addr}/cos")).unwrap(),
        bucket,
        None,
        tokens,
    )
}

#[tokio::test]
async fn remote_json_body_is_embedded() {
    let addr = serve().await;
    let base = Url::parse(&format!("http://{addr}/peer")).unwrap();
    let body = remote_get(&reqwest::Client::new(), &base, "increment", TIMEOUT).await;
    assert_eq!(body, json!({ "count": 7 }));
}

#[tokio::test]
async fn remote_plain_body_is_wrapped() {
    let addr = serve().await;
    let base = Url::parse(&format!("http://{addr}/plain/")).unwrap();
    let body = remote_get(&reqwest::Client::new(), &base, "increment", TIMEOUT).await;
    assert_eq!(body, json!({ "notjson": "plain body" }));
}

#[tokio::test]
async fn remote_transport_error_names_the_url() {
    let addr = closed_addr().await;
    let base = Url::parse(&format!("http://{addr}/")).unwrap();
    let body = remote_get(&reqwest::Client::new(), &base, "increment", TIMEOUT).await;
    assert_eq!(
        body,
        json!({ "error": format!("error accessing http://{addr}/increment") })
    );
}

#[tokio::test]
async fn object_exists_splits_not_found_from_other_statuses() {
    let addr = serve().await;
    let client = cos_client(addr, "bucket-a");

    client.check_bucket().await.unwrap();
    assert!(client.exists("present").await.unwrap());
    assert!(!client.exists("absent").await.unwrap());

    let err = client.exists("locked").await.unwrap_err();
    assert!(
        matches!(
            err,
            TierError::ObjectStore {
                status: StatusCode::FORBIDDEN,
                ..
            }
        ),
        "{err}"
    );
}

#[tokio::test]
async fn object_get_returns_the_stored_body() {
    let addr = serve().await;
    let client = cos_client(addr, "bucket-a");

    let body = client.get("present").await.unwrap();
    assert_eq!(
        serde_json::from_slice::<Value>(&body).unwrap(),
        json!({ "count": 3 })
    );
    let err = client.get("absent").await.unwrap_err();
    assert!(matches!(
        err,
        TierError::ObjectStore {
            status: StatusCode::NOT_FOUND,
            ..
        }
    ));
}

#[tokio::test]
async fn unreachable_bucket_fails_the_check() {
    let addr = serve().await;
    let err = cos_client(addr, "bucket-b").check_bucket().await.unwrap_err();
    assert!(matches!(
        err,
        TierError::ObjectStore {
            status: StatusCode::FORBIDDEN,
            ..
        }
    ));
}
