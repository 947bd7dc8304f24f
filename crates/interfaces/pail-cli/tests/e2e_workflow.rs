use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header::HeaderMap;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use camino::Utf8PathBuf;
use chrono::Utc;
use pail_cli::commands;
use pail_pipeline::sync::SyncOptions;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

#[derive(Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    etag: String,
    metadata: Option<String>,
    last_modified: String,
}

#[derive(Clone, Default)]
struct StoreState {
    objects: Arc<Mutex<HashMap<String, StoredObject>>>,
}

async fn list_objects(State(state): State<StoreState>) -> Response {
    let objects = state.objects.lock().unwrap();
    let entries: Vec<serde_json::Value> = objects
        .iter()
        .map(|(key, obj)| {
            serde_json::json!({
                "key": key,
                "etag": format!("\"{}\"", obj.etag),
                "size": obj.bytes.len(),
                "last_modified": obj.last_modified,
                "metadata": obj.metadata,
            })
        })
        .collect();
    let body = serde_json::json!({ "objects": entries }).to_string();
    ([("content-type", "application/json")], body).into_response()
}

async fn get_object(State(state): State<StoreState>, Path(key): Path<String>) -> Response {
    match state.objects.lock().unwrap().get(&key).cloned() {
        Some(obj) => {
            let mut resp = obj.bytes.into_response();
            resp.headers_mut()
                .insert("etag", format!("\"{}\"", obj.etag).parse().unwrap());
            resp.headers_mut()
                .insert("last-modified", obj.last_modified.parse().unwrap());
            if let Some(meta) = &obj.metadata {
                resp.headers_mut()
                    .insert("x-object-meta", meta.parse().unwrap());
            }
            resp
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn put_object(
    State(state): State<StoreState>,
    Path(key): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let metadata = headers
        .get("x-object-meta")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    state.objects.lock().unwrap().insert(
        key,
        StoredObject {
            bytes: body.to_vec(),
            etag: pail_infra::hashing::hash_bytes(&body),
            metadata,
            last_modified: Utc::now().to_rfc3339(),
        },
    );
    StatusCode::CREATED
}

async fn start_store(state: StoreState) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/objects", get(list_objects))
        .route("/objects/*key", get(get_object).put(put_object))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, handle)
}

#[tokio::test]
async fn sync_then_diff_workflow() {
    let state = StoreState::default();
    state.objects.lock().unwrap().insert(
        "seeded.txt".to_string(),
        StoredObject {
            bytes: b"from the store".to_vec(),
            etag: pail_infra::hashing::hash_bytes(b"from the store"),
            metadata: Some(r#"{"mtime":1650000000000000000}"#.to_string()),
            last_modified: "2022-04-15T00:00:00Z".to_string(),
        },
    );
    let (addr, _server_handle) = start_store(state.clone()).await;
    let store_url = format!("http://{addr}");

    let work_dir = tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(work_dir.path().to_path_buf()).unwrap();
    std::fs::write(root.join("local.txt"), b"from the tree").unwrap();

    // Phase 1: fresh sync pulls the seeded object and pushes the local
    // file, exiting cleanly.
    commands::cmd_sync(
        store_url.clone(),
        root.clone(),
        SyncOptions::default(),
        false,
    )
    .await
    .unwrap();

    assert_eq!(
        std::fs::read(root.join("seeded.txt")).unwrap(),
        b"from the store"
    );
    assert!(state.objects.lock().unwrap().contains_key("local.txt"));

    // Phase 2: dry-run diff right after a clean pass reports nothing.
    commands::cmd_diff(store_url.clone(), root.clone(), 10, false)
        .await
        .unwrap();

    // Phase 3: a second sync is a no-op and still exits cleanly.
    commands::cmd_sync(store_url, root.clone(), SyncOptions::default(), false)
        .await
        .unwrap();

    // Phase 4: tree rendering of the reconciled root works.
    commands::cmd_tree(Some(root), None).await.unwrap();
}
