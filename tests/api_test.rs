//! HTTP API tests driven through the router with `tower::ServiceExt::oneshot`.

mod common;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use common::{SALES_TABLE, create_sqlite_db};
use flatfile_ingest::api::{AppState, create_router};
use flatfile_ingest::db::DatabaseGateway;
use flatfile_ingest::pipeline::FileCatalog;
use serde_json::{Value as JsonValue, json};
use std::path::Path;
use tower::ServiceExt;

const MAX_UPLOAD: usize = 64 * 1024;

fn app(upload_dir: &Path) -> (Router, DatabaseGateway) {
    let gateway = DatabaseGateway::default();
    let state = AppState::new(gateway.clone(), FileCatalog::new(upload_dir), MAX_UPLOAD);
    (create_router(state), gateway)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, JsonValue) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: JsonValue) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart_upload(filename: &str, contents: &str) -> Request<Body> {
    let boundary = "ingest-test-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
         Content-Type: text/csv\r\n\r\n{c}\r\n--{b}--\r\n",
        b = boundary,
        f = filename,
        c = contents
    );
    Request::builder()
        .method("POST")
        .uri("/flatfile/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_root_reports_connection_state() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = app(dir.path());
    let (status, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["connected"], false);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_tables_before_connect_is_not_connected() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = app(dir.path());
    let (status, body) = send(&app, get("/tables")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "NOT_CONNECTED");
    assert!(body["error"]["suggestion"].is_string());
}

#[tokio::test]
async fn test_connect_export_and_list_files() {
    let dir = tempfile::tempdir().unwrap();
    let db = create_sqlite_db(dir.path(), "sales.db", SALES_TABLE).await;
    let uploads = dir.path().join("uploads");
    let (app, gateway) = app(&uploads);

    let (status, body) = send(
        &app,
        post_json(
            "/connect",
            json!({"db_type": "sqlite", "database": db.display().to_string()}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body[0]["name"], "main.sales");
    assert!(gateway.is_connected().await);

    let (status, body) = send(&app, get("/tables/main.sales/columns")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "id");
    assert_eq!(body[1]["name"], "date");

    let (status, body) = send(
        &app,
        post_json("/export", json!({"table_name": "sales", "columns": ["id", "date"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["record_count"], 2);
    assert_eq!(body["records"][0], json!({"id": 1, "data": {"id": 1, "date": "2023-01-01"}}));

    let (status, body) = send(&app, get("/files")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "sales_export.csv");
    assert_eq!(body[0]["record_count"], 2);

    let (status, body) = send(&app, get("/files/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["records"][1]["data"]["date"], "2023-02-15");

    let (status, body) = send(&app, get("/files/5")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "FILE_NOT_FOUND");
}

#[tokio::test]
async fn test_preview_with_bad_identifier() {
    let dir = tempfile::tempdir().unwrap();
    let db = create_sqlite_db(dir.path(), "sales.db", SALES_TABLE).await;
    let (app, gateway) = app(dir.path());
    gateway
        .connect(flatfile_ingest::models::ConnectionConfig::sqlite(db.to_str().unwrap()))
        .await
        .unwrap();

    let (status, body) = send(
        &app,
        post_json(
            "/preview",
            json!({"table_name": "sales; DROP TABLE sales", "columns": ["id"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_IDENTIFIER");

    let (status, body) = send(
        &app,
        post_json("/preview", json!({"table_name": "sales", "columns": ["id"], "limit": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["record_count"], 1);
}

#[tokio::test]
async fn test_upload_then_inspect_and_import() {
    let dir = tempfile::tempdir().unwrap();
    let db = create_sqlite_db(dir.path(), "target.db", &["CREATE TABLE people (id INTEGER, name TEXT)"]).await;
    let uploads = dir.path().join("uploads");
    let (app, gateway) = app(&uploads);
    gateway
        .connect(flatfile_ingest::models::ConnectionConfig::sqlite(db.to_str().unwrap()))
        .await
        .unwrap();

    let (status, body) = send(&app, multipart_upload("people.csv", "id,name\n1,ann\n2,bob\n")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["filename"], "people.csv");
    assert_eq!(body["row_count"], 2);
    assert_eq!(body["column_count"], 2);

    let (status, body) = send(&app, get("/flatfile/columns/people.csv")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"name": "id", "type": "integer"}, {"name": "name", "type": "text"}]));

    let (status, body) = send(&app, get("/flatfile/preview/people.csv?limit=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_rows"], 2);
    assert_eq!(body["records"].as_array().unwrap().len(), 1);

    let file_path = uploads.join("people.csv").display().to_string();
    let (status, body) = send(
        &app,
        post_json(
            "/import",
            json!({"table_name": "people", "file_path": file_path, "columns": ["id", "name"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["record_count"], 2);
}

#[tokio::test]
async fn test_upload_over_limit_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = app(dir.path());
    let big = "a\n".repeat(MAX_UPLOAD);
    let response = app
        .clone()
        .oneshot(multipart_upload("big.csv", &big))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
    assert!(!dir.path().join("big.csv").exists());
}

#[tokio::test]
async fn test_flatfile_columns_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = app(dir.path());
    let (status, body) = send(&app, get("/flatfile/columns/absent.csv")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "FILE_NOT_FOUND");
}
