use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use callcoach::app::{self, AppState};
use callcoach::call_models::{CallOutcome, CreateCallRequest};
use callcoach::client::ApiClient;
use callcoach::config::Config;
use callcoach::dashboard::{self, DataOrigin};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[derive(Default)]
struct Hits {
    analytics: AtomicUsize,
    calls: AtomicUsize,
}

async fn broken_analytics(State(hits): State<Arc<Hits>>) -> (StatusCode, Json<Value>) {
    hits.analytics.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "message": "analytics warehouse offline" })),
    )
}

async fn call_list(State(hits): State<Arc<Hits>>) -> Json<Value> {
    hits.calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "success": true,
        "data": { "calls": [
            {
                "id": "c1",
                "title": "Renewal",
                "duration": 125,
                "outcome": "success",
                "score": 91,
                "createdAt": "2026-10-15T10:00:00Z"
            },
            {
                "id": "c2",
                "title": "Cold call",
                "duration": 40,
                "outcome": "failed",
                "performanceData": { "overallScore": 64 },
                "createdAt": "2026-10-14T10:00:00Z"
            }
        ]}
    }))
}

#[tokio::test]
async fn falls_back_to_calls_list_over_http() {
    let hits = Arc::new(Hits::default());
    let router = Router::new()
        .route("/dashboard/analytics", get(broken_analytics))
        .route("/calls", get(call_list))
        .with_state(hits.clone());
    let base_url = serve(router).await;

    let client = ApiClient::new(base_url).with_token("any");
    let dashboard = dashboard::load(&client).await;

    assert_eq!(hits.analytics.load(Ordering::SeqCst), 1);
    assert_eq!(hits.calls.load(Ordering::SeqCst), 1);
    assert_eq!(dashboard.origin, DataOrigin::CallsList);
    assert_eq!(dashboard.data.total_calls, 2);
    assert_eq!(dashboard.data.success_rate, 50.0);
    assert_eq!(dashboard.data.average_duration, 83);

    let rendered = dashboard::recent_calls_table(&dashboard.data.recent_calls).to_string();
    assert!(rendered.contains("Renewal"));
    assert!(rendered.contains("2m"));
    assert!(rendered.contains("91"));
    assert!(rendered.contains("40s"));
    assert!(rendered.contains("64"));
}

#[tokio::test]
async fn unreachable_api_renders_placeholders() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ApiClient::new(format!("http://{addr}")).with_token("any");
    let dashboard = dashboard::load(&client).await;

    assert_eq!(dashboard.origin, DataOrigin::Unavailable);
    assert_eq!(dashboard.data.total_calls, 0);
    assert!(dashboard.is_empty());
}

#[tokio::test]
async fn client_round_trip_against_service() {
    let dir = tempfile::tempdir().unwrap();
    let state = Arc::new(AppState::from_config(&Config::in_dir(dir.path())).unwrap());
    let base_url = serve(app::router(state)).await;

    let anonymous = ApiClient::new(&base_url);
    anonymous.signup("casey", "hunter22").await.unwrap();
    let login = anonymous.login("casey", "hunter22").await.unwrap();
    let client = anonymous.with_token(login.token);

    let err = ApiClient::new(&base_url).list_documents().await.unwrap_err();
    assert!(err.to_string().contains("Authentication required"));

    let upload_path = dir.path().join("script.txt");
    std::fs::write(&upload_path, "Opening: ask about their current tooling.").unwrap();
    let uploaded = client
        .upload_document(&upload_path, None, &["scripts".to_string()])
        .await
        .unwrap();
    assert_eq!(uploaded.name, "script.txt");
    assert_eq!(uploaded.tags, vec!["scripts"]);
    assert!(uploaded.processed);

    let link = client
        .create_url_document("Pricing page", "https://example.com/pricing", vec![])
        .await
        .unwrap();
    assert_eq!(client.list_documents().await.unwrap().len(), 2);

    client.delete_document(&link.id).await.unwrap();
    assert!(client.get_document(&link.id).await.is_err());

    client
        .log_call(&CreateCallRequest {
            title: Some("Discovery".into()),
            duration: 600,
            outcome: CallOutcome::Success,
            score: Some(82.0),
            ai_suggestions_used: true,
            ..Default::default()
        })
        .await
        .unwrap();

    let dashboard = dashboard::load(&client).await;
    assert_eq!(dashboard.origin, DataOrigin::Analytics);
    assert_eq!(dashboard.data.total_calls, 1);
    assert_eq!(dashboard.data.ai_suggestions_used_rate, 100.0);
    assert_eq!(dashboard.data.daily_call_data.len(), 7);
    assert_eq!(dashboard.data.recent_calls[0].title, "Discovery");
}
