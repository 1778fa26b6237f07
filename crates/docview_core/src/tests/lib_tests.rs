use super::*;
use std::{collections::HashMap, time::Duration};

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use shared::{
    error::StoreErrorBody,
    protocol::{DeleteBatchRequest, SearchRequest},
};
use tokio::{net::TcpListener, sync::Notify};

#[derive(Debug, Clone, PartialEq, Eq)]
struct CapturedUpload {
    field: String,
    filename: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListFailure {
    Status,
    Malformed,
}

#[derive(Clone, Default)]
struct MockStore {
    calls: Arc<Mutex<Vec<String>>>,
    documents: Arc<Mutex<Vec<Document>>>,
    details: Arc<Mutex<HashMap<String, Document>>>,
    detail_delays: Arc<Mutex<HashMap<String, Duration>>>,
    uploads: Arc<Mutex<Vec<CapturedUpload>>>,
    stored_on_upload: Arc<Mutex<Option<Document>>>,
    upload_started: Arc<Notify>,
    upload_gate: Arc<Mutex<Option<Arc<Notify>>>>,
    fail_uploads: Arc<Mutex<bool>>,
    fail_batch_deletes: Arc<Mutex<bool>>,
    list_failure: Arc<Mutex<Option<ListFailure>>>,
}

impl MockStore {
    async fn with_documents(self, documents: Vec<Document>) -> Self {
        {
            let mut details = self.details.lock().await;
            for doc in &documents {
                details.insert(doc.id.0.clone(), doc.clone());
            }
        }
        *self.documents.lock().await = documents;
        self
    }

    async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, call: String) {
        self.calls.lock().await.push(call);
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(StoreErrorBody::new("Record not found")),
    )
        .into_response()
}

async fn handle_list(State(store): State<MockStore>) -> Response {
    store.record("GET /list".to_string()).await;
    match *store.list_failure.lock().await {
        Some(ListFailure::Status) => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        Some(ListFailure::Malformed) => (StatusCode::OK, "not json").into_response(),
        None => Json(store.documents.lock().await.clone()).into_response(),
    }
}

async fn handle_upload(State(store): State<MockStore>, mut multipart: Multipart) -> Response {
    store.record("POST /upload".to_string()).await;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        store.uploads.lock().await.push(CapturedUpload {
            field: name,
            filename,
            content_type,
            bytes,
        });
    }

    store.upload_started.notify_one();
    let gate = store.upload_gate.lock().await.clone();
    if let Some(gate) = gate {
        gate.notified().await;
    }
    if *store.fail_uploads.lock().await {
        return (StatusCode::INTERNAL_SERVER_ERROR, "ocr failed").into_response();
    }
    if let Some(doc) = store.stored_on_upload.lock().await.take() {
        store.documents.lock().await.push(doc);
    }
    Json(serde_json::json!({ "id": "x" })).into_response()
}

async fn handle_delete(State(store): State<MockStore>, Path(id): Path<String>) -> Response {
    store.record(format!("DELETE /delete/{id}")).await;
    let mut documents = store.documents.lock().await;
    let before = documents.len();
    documents.retain(|doc| doc.id.0 != id);
    if documents.len() == before {
        return not_found();
    }
    Json(serde_json::json!({ "message": format!("Deleted record {id}") })).into_response()
}

async fn handle_delete_batch(
    State(store): State<MockStore>,
    Json(request): Json<DeleteBatchRequest>,
) -> Response {
    store.record("DELETE /delete-batch".to_string()).await;
    if request.ids.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(StoreErrorBody::new("No IDs provided")),
        )
            .into_response();
    }
    if *store.fail_batch_deletes.lock().await {
        return (StatusCode::INTERNAL_SERVER_ERROR, "db unavailable").into_response();
    }
    let mut documents = store.documents.lock().await;
    let before = documents.len();
    documents.retain(|doc| !request.ids.contains(&doc.id));
    let removed = before - documents.len();
    Json(serde_json::json!({ "message": format!("Deleted {removed} records") })).into_response()
}

async fn handle_detail(State(store): State<MockStore>, Path(id): Path<String>) -> Response {
    store.record(format!("GET /detail/{id}")).await;
    let delay = store.detail_delays.lock().await.get(&id).copied();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    match store.details.lock().await.get(&id) {
        Some(doc) => Json(doc.clone()).into_response(),
        None => not_found(),
    }
}

async fn handle_search(
    State(store): State<MockStore>,
    Json(request): Json<SearchRequest>,
) -> Response {
    store.record("POST /search".to_string()).await;
    let hits: Vec<SearchHit> = store
        .documents
        .lock()
        .await
        .iter()
        .filter(|doc| doc.text.contains(&request.text))
        .map(|doc| SearchHit {
            id: doc.id.clone(),
            text: doc.text.clone(),
            similarity: 0.9,
            created_at: doc.created_at.clone(),
        })
        .collect();
    Json(hits).into_response()
}

async fn handle_count(State(store): State<MockStore>) -> Response {
    store.record("GET /count".to_string()).await;
    let count = store.documents.lock().await.len();
    Json(serde_json::json!({ "count": count })).into_response()
}

async fn spawn_store(store: MockStore) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = Router::new()
        .route("/list", get(handle_list))
        .route("/upload", post(handle_upload))
        .route("/delete/:id", delete(handle_delete))
        .route("/delete-batch", delete(handle_delete_batch))
        .route("/detail/:id", get(handle_detail))
        .route("/search", post(handle_search))
        .route("/count", get(handle_count))
        .with_state(store);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

async fn view_for(store: &MockStore) -> Arc<DocumentView> {
    let api_base = spawn_store(store.clone()).await;
    DocumentView::new(Arc::new(HttpDocumentStore::new(api_base)))
}

fn doc(id: &str, text: &str) -> Document {
    Document::new(id, text, "2024-01-01", vec![0.1, 0.2, 0.3])
}

fn drain(rx: &mut broadcast::Receiver<ViewEvent>) -> Vec<ViewEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn mount_populates_registry_in_store_order() {
    let store = MockStore::default()
        .with_documents(vec![doc("b", "second"), doc("a", "first")])
        .await;
    let view = view_for(&store).await;

    let count = view.mount().await.expect("mount");

    assert_eq!(count, 2);
    assert_eq!(
        view.snapshot().await.documents,
        vec![doc("b", "second"), doc("a", "first")]
    );
    assert_eq!(store.calls().await, vec!["GET /list"]);
}

#[tokio::test]
async fn refresh_replaces_registry_instead_of_merging() {
    let store = MockStore::default()
        .with_documents(vec![doc("a", "1"), doc("b", "2")])
        .await;
    let view = view_for(&store).await;
    view.refresh().await.expect("first refresh");

    *store.documents.lock().await = vec![doc("c", "3")];
    view.refresh().await.expect("second refresh");

    assert_eq!(view.documents().await, vec![doc("c", "3")]);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_registry() {
    let store = MockStore::default().with_documents(vec![doc("a", "1")]).await;
    let view = view_for(&store).await;
    view.refresh().await.expect("initial refresh");
    let mut events = view.subscribe_events();

    *store.documents.lock().await = vec![doc("z", "26")];
    *store.list_failure.lock().await = Some(ListFailure::Status);
    let err = view.refresh().await.expect_err("status failure");
    assert_eq!(err.kind(), StoreErrorKind::NonSuccessStatus);
    assert_eq!(err.status(), Some(500));

    *store.list_failure.lock().await = Some(ListFailure::Malformed);
    let err = view.refresh().await.expect_err("malformed failure");
    assert_eq!(err.kind(), StoreErrorKind::MalformedPayload);

    assert_eq!(view.documents().await, vec![doc("a", "1")]);
    let failures: Vec<_> = drain(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            ViewEvent::OperationFailed {
                operation, kind, ..
            } => Some((operation, kind)),
            ViewEvent::StateChanged(_) => None,
        })
        .collect();
    assert_eq!(
        failures,
        vec![
            (ViewOperation::Refresh, StoreErrorKind::NonSuccessStatus),
            (ViewOperation::Refresh, StoreErrorKind::MalformedPayload),
        ]
    );
}

#[tokio::test]
async fn upload_posts_file_then_refreshes_registry() {
    let store = MockStore::default();
    *store.stored_on_upload.lock().await = Some(Document::new("x", "t", "c", vec![0.1, 0.2]));
    let view = view_for(&store).await;
    view.mount().await.expect("mount");
    assert!(view.snapshot().await.documents.is_empty());

    view.choose_file(PendingFile::new("scan.png", b"png-bytes".to_vec()))
        .await;
    let uploaded = view.upload().await.expect("upload");

    assert!(uploaded);
    assert_eq!(
        store.calls().await,
        vec!["GET /list", "POST /upload", "GET /list"]
    );
    assert_eq!(
        store.uploads.lock().await.clone(),
        vec![CapturedUpload {
            field: "file".to_string(),
            filename: Some("scan.png".to_string()),
            content_type: Some("image/png".to_string()),
            bytes: b"png-bytes".to_vec(),
        }]
    );

    let snapshot = view.snapshot().await;
    assert_eq!(
        snapshot.documents,
        vec![Document::new("x", "t", "c", vec![0.1, 0.2])]
    );
    assert!(!snapshot.upload_pending);
    assert!(snapshot.pending_file.is_none());
}

#[tokio::test]
async fn upload_without_chosen_file_makes_no_request() {
    let store = MockStore::default();
    let view = view_for(&store).await;

    let uploaded = view.upload().await.expect("noop upload");

    assert!(!uploaded);
    assert!(store.calls().await.is_empty());
    assert!(!view.snapshot().await.upload_pending);
}

#[tokio::test]
async fn upload_disables_affordance_while_in_flight() {
    let store = MockStore::default();
    let gate = Arc::new(Notify::new());
    *store.upload_gate.lock().await = Some(Arc::clone(&gate));
    let view = view_for(&store).await;
    view.choose_file(PendingFile::new("a.pdf", b"%PDF".to_vec()))
        .await;

    let task = {
        let view = Arc::clone(&view);
        tokio::spawn(async move { view.upload().await })
    };
    store.upload_started.notified().await;

    let during = view.snapshot().await;
    assert!(during.upload_pending);
    assert_eq!(
        during.upload_affordance(),
        UploadAffordance {
            enabled: false,
            label: state::UPLOAD_BUSY_LABEL,
        }
    );

    gate.notify_one();
    task.await.expect("join").expect("upload");
    let after = view.snapshot().await;
    assert!(!after.upload_pending);
    assert_eq!(after.upload_affordance().label, state::UPLOAD_LABEL);
    assert_eq!(
        store
            .calls()
            .await
            .iter()
            .filter(|call| call.as_str() == "POST /upload")
            .count(),
        1
    );
}

#[tokio::test]
async fn failed_upload_still_clears_file_and_pending_flag_and_refreshes() {
    let store = MockStore::default().with_documents(vec![doc("a", "1")]).await;
    *store.fail_uploads.lock().await = true;
    let view = view_for(&store).await;
    view.choose_file(PendingFile::new("scan.jpg", vec![0xff, 0xd8]))
        .await;

    let err = view.upload().await.expect_err("upload must fail");

    assert_eq!(err.kind(), StoreErrorKind::NonSuccessStatus);
    assert_eq!(store.calls().await, vec!["POST /upload", "GET /list"]);
    let snapshot = view.snapshot().await;
    assert!(!snapshot.upload_pending);
    assert!(snapshot.pending_file.is_none());
    assert_eq!(snapshot.documents, vec![doc("a", "1")]);
}

#[tokio::test]
async fn delete_is_followed_by_exactly_one_refresh() {
    let store = MockStore::default()
        .with_documents(vec![doc("d1", "hello"), doc("d2", "world")])
        .await;
    let view = view_for(&store).await;

    view.delete(&DocumentId::new("d1")).await.expect("delete");

    assert_eq!(store.calls().await, vec!["DELETE /delete/d1", "GET /list"]);
    assert_eq!(view.documents().await, vec![doc("d2", "world")]);
}

#[tokio::test]
async fn deleting_a_listed_row_never_loads_its_detail() {
    let row = Document::new("d1", "hello", "2024-01-01", vec![0.5, 0.25]);
    let store = MockStore::default().with_documents(vec![row]).await;
    let view = view_for(&store).await;
    view.mount().await.expect("mount");

    view.delete(&DocumentId::new("d1")).await.expect("delete");

    let calls = store.calls().await;
    assert!(calls.contains(&"DELETE /delete/d1".to_string()));
    assert!(!calls.iter().any(|call| call.starts_with("GET /detail/")));
    assert_eq!(view.snapshot().await.selection, Selection::Empty);
}

#[tokio::test]
async fn failed_delete_still_refreshes() {
    let store = MockStore::default().with_documents(vec![doc("a", "1")]).await;
    let view = view_for(&store).await;

    let err = view
        .delete(&DocumentId::new("missing"))
        .await
        .expect_err("delete must fail");

    assert!(err.to_string().contains("Record not found"), "{err}");
    assert_eq!(
        store.calls().await,
        vec!["DELETE /delete/missing", "GET /list"]
    );
    assert_eq!(view.documents().await, vec![doc("a", "1")]);
}

#[tokio::test]
async fn deleting_selected_document_keeps_selection() {
    let store = MockStore::default().with_documents(vec![doc("a", "1")]).await;
    let view = view_for(&store).await;
    view.select(&DocumentId::new("a")).await.expect("select");

    view.delete(&DocumentId::new("a")).await.expect("delete");

    let snapshot = view.snapshot().await;
    assert!(snapshot.documents.is_empty());
    assert_eq!(snapshot.selected_document(), Some(&doc("a", "1")));
}

#[tokio::test]
async fn batch_delete_is_followed_by_exactly_one_refresh() {
    let store = MockStore::default()
        .with_documents(vec![doc("d1", "a"), doc("d2", "b"), doc("d3", "c")])
        .await;
    let view = view_for(&store).await;

    let message = view
        .delete_many(&[DocumentId::new("d1"), DocumentId::new("d3")])
        .await
        .expect("batch delete");

    assert_eq!(message.as_deref(), Some("Deleted 2 records"));
    assert_eq!(store.calls().await, vec!["DELETE /delete-batch", "GET /list"]);
    assert_eq!(view.documents().await, vec![doc("d2", "b")]);
}

#[tokio::test]
async fn empty_batch_delete_makes_no_request() {
    let store = MockStore::default().with_documents(vec![doc("a", "1")]).await;
    let view = view_for(&store).await;

    let message = view.delete_many(&[]).await.expect("empty batch");

    assert!(message.is_none());
    assert!(store.calls().await.is_empty());
}

#[tokio::test]
async fn rejected_batch_delete_still_refreshes() {
    let store = MockStore::default().with_documents(vec![doc("a", "1")]).await;
    let view = view_for(&store).await;
    let http = HttpDocumentStore::new(spawn_store(store.clone()).await);

    let err = http.delete_batch(&[]).await.expect_err("empty batch");
    assert_eq!(err.status(), Some(400));
    assert!(err.to_string().contains("No IDs provided"), "{err}");

    *store.calls.lock().await = Vec::new();
    *store.fail_batch_deletes.lock().await = true;
    let err = view
        .delete_many(&[DocumentId::new("a")])
        .await
        .expect_err("batch delete must fail");
    assert_eq!(err.kind(), StoreErrorKind::NonSuccessStatus);
    assert_eq!(store.calls().await, vec!["DELETE /delete-batch", "GET /list"]);
    assert_eq!(view.documents().await, vec![doc("a", "1")]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_updates_broadcast_snapshots_in_state_order() {
    let store = MockStore::default();
    let view = view_for(&store).await;
    let mut events = view.subscribe_events();

    let tasks: Vec<_> = (0..200)
        .map(|i| {
            let view = Arc::clone(&view);
            tokio::spawn(async move {
                if i % 2 == 0 {
                    view.choose_file(PendingFile::new(format!("{i}.png"), vec![1]))
                        .await;
                } else {
                    view.clear_file().await;
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.expect("join");
    }

    let last = drain(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            ViewEvent::StateChanged(snapshot) => Some(snapshot),
            ViewEvent::OperationFailed { .. } => None,
        })
        .last()
        .expect("state events");
    assert_eq!(last, view.snapshot().await);
}

#[tokio::test]
async fn select_loads_full_detail_record() {
    let mut detailed = doc("a", "full text\nsecond line");
    detailed
        .extra
        .insert("title".to_string(), serde_json::json!("scan"));
    let store = MockStore::default().with_documents(vec![doc("a", "full text")]).await;
    store
        .details
        .lock()
        .await
        .insert("a".to_string(), detailed.clone());
    let view = view_for(&store).await;

    let applied = view.select(&DocumentId::new("a")).await.expect("select");

    assert!(applied);
    assert_eq!(view.snapshot().await.selection, Selection::Populated(detailed));
    assert_eq!(store.calls().await, vec!["GET /detail/a"]);
}

#[tokio::test]
async fn later_selection_wins_when_earlier_detail_resolves_last() {
    let store = MockStore::default()
        .with_documents(vec![doc("a", "alpha"), doc("b", "beta")])
        .await;
    store
        .detail_delays
        .lock()
        .await
        .insert("a".to_string(), Duration::from_millis(250));
    let view = view_for(&store).await;

    let slow = {
        let view = Arc::clone(&view);
        tokio::spawn(async move { view.select(&DocumentId::new("a")).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let applied_b = view.select(&DocumentId::new("b")).await.expect("select b");
    let applied_a = slow.await.expect("join").expect("select a");

    assert!(applied_b);
    assert!(!applied_a);
    assert_eq!(
        view.snapshot().await.selection,
        Selection::Populated(doc("b", "beta"))
    );
}

#[tokio::test]
async fn later_selection_wins_when_it_resolves_last() {
    let store = MockStore::default()
        .with_documents(vec![doc("a", "alpha"), doc("b", "beta")])
        .await;
    store
        .detail_delays
        .lock()
        .await
        .insert("b".to_string(), Duration::from_millis(150));
    let view = view_for(&store).await;

    let (a_id, b_id) = (DocumentId::new("a"), DocumentId::new("b"));
    let (a, b) = futures::join!(view.select(&a_id), view.select(&b_id));

    assert!(!a.expect("select a"));
    assert!(b.expect("select b"));
    assert_eq!(
        view.snapshot().await.selection,
        Selection::Populated(doc("b", "beta"))
    );
}

#[tokio::test]
async fn failed_reselection_keeps_previous_detail() {
    let store = MockStore::default().with_documents(vec![doc("a", "alpha")]).await;
    let view = view_for(&store).await;
    view.select(&DocumentId::new("a")).await.expect("select a");

    let err = view
        .select(&DocumentId::new("gone"))
        .await
        .expect_err("missing detail");

    assert_eq!(err.status(), Some(404));
    assert_eq!(
        view.snapshot().await.selection,
        Selection::Populated(doc("a", "alpha"))
    );
}

#[tokio::test]
async fn failed_first_selection_leaves_nothing_selected() {
    let store = MockStore::default();
    let view = view_for(&store).await;

    view.select(&DocumentId::new("gone"))
        .await
        .expect_err("missing detail");

    assert_eq!(view.snapshot().await.selection, Selection::Empty);
}

#[tokio::test]
async fn close_clears_selection_without_requests() {
    let store = MockStore::default().with_documents(vec![doc("a", "alpha")]).await;
    let view = view_for(&store).await;
    view.select(&DocumentId::new("a")).await.expect("select");
    let calls_before = store.calls().await;

    view.close_detail().await;

    assert_eq!(view.snapshot().await.selection, Selection::Empty);
    assert_eq!(store.calls().await, calls_before);
}

#[tokio::test]
async fn search_returns_hits_without_touching_view_state() {
    let store = MockStore::default()
        .with_documents(vec![doc("a", "invoice 2024"), doc("b", "receipt")])
        .await;
    let view = view_for(&store).await;
    let mut events = view.subscribe_events();

    let hits = view.search("  invoice ").await.expect("search");
    let blank = view.search("   ").await.expect("blank search");

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, DocumentId::new("a"));
    assert!(blank.is_empty());
    assert_eq!(store.calls().await, vec!["POST /search"]);
    assert!(drain(&mut events).is_empty());
    assert!(view.snapshot().await.documents.is_empty());
}

#[tokio::test]
async fn count_reports_store_total() {
    let store = MockStore::default()
        .with_documents(vec![doc("a", "1"), doc("b", "2"), doc("c", "3")])
        .await;
    let view = view_for(&store).await;

    assert_eq!(view.count().await.expect("count"), 3);
}

#[tokio::test]
async fn unconfigured_view_starts_and_fails_requests_gracefully() {
    let view = DocumentView::from_settings(&ClientSettings::default());

    let err = view.mount().await.expect_err("placeholder base");
    assert_eq!(err.kind(), StoreErrorKind::NetworkFailure);

    view.choose_file(PendingFile::new("scan.png", vec![1]))
        .await;
    view.upload().await.expect_err("placeholder base");

    let snapshot = view.snapshot().await;
    assert!(snapshot.documents.is_empty());
    assert!(!snapshot.upload_pending);
    assert!(snapshot.pending_file.is_none());
}
