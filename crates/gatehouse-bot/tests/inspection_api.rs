//! Read-only ledger API.

use gatehouse_bot::api::build_router;
use gatehouse_ledger::{LedgerStore, MemoryBackend, UserId};
use serde_json::Value;
use std::sync::Arc;

async fn serve(store: Arc<LedgerStore>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, build_router(store)).await;
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn ledger_entries_are_visible_without_side_effects() {
    let store = Arc::new(LedgerStore::open(MemoryBackend::new()).unwrap());
    store
        .transaction(|ledger| {
            ledger.ensure_founder(UserId(1));
            ledger.add_quota(UserId(1), 2);
            ledger.record_invite(UserId(1), UserId(2));
            Ok(())
        })
        .await
        .unwrap();
    let base = serve(Arc::clone(&store)).await;
    let http = reqwest::Client::new();

    let health = http.get(format!("{}/health", base)).send().await.unwrap();
    assert_eq!(health.text().await.unwrap(), "OK");

    let entry: Value = http
        .get(format!("{}/api/v1/ledger/1", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(entry["tracked"], true);
    assert_eq!(entry["invites_left"], 3);
    assert_eq!(entry["inviter"], "founder");
    assert_eq!(entry["invitees"], serde_json::json!(["2"]));

    let before = store.snapshot().await;
    let unknown: Value = http
        .get(format!("{}/api/v1/ledger/77", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(unknown["tracked"], false);
    assert_eq!(unknown["inviter"], Value::Null);
    assert_eq!(store.snapshot().await, before);

    let summary: Value = http
        .get(format!("{}/api/v1/ledger", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["tracked_users"], 2);
    assert_eq!(summary["founders"], 1);
    assert_eq!(summary["total_invites"], 3);

    let bad = http
        .get(format!("{}/api/v1/ledger/not-a-user", base))
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), reqwest::StatusCode::BAD_REQUEST);
}
