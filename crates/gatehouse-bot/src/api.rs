//! Read-only HTTP view of the ledger.
//!
//! Used to reconcile the ledger against the platform by hand, e.g. after a
//! failed role grant. Nothing here initializes founders or writes the ledger.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use gatehouse_ledger::{Inviter, LedgerStore, UserId};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

type AppState = Arc<LedgerStore>;

/// Build the API router.
pub fn build_router(store: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/api/v1/ledger", get(get_summary))
        .route("/api/v1/ledger/:user_id", get(get_entry))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

async fn health() -> &'static str {
    "OK"
}

async fn ready() -> &'static str {
    "OK"
}

#[derive(Debug, Serialize)]
struct LedgerSummary {
    tracked_users: usize,
    founders: usize,
    total_invites: u64,
}

async fn get_summary(State(store): State<AppState>) -> Json<LedgerSummary> {
    let ledger = store.snapshot().await;
    Json(LedgerSummary {
        tracked_users: ledger.invited_by.len(),
        founders: ledger.founders().count(),
        total_invites: ledger.total_invites(),
    })
}

#[derive(Debug, Serialize)]
struct LedgerEntry {
    user: UserId,
    tracked: bool,
    invites_left: u64,
    inviter: Option<Inviter>,
    invitees: Vec<UserId>,
}

async fn get_entry(
    State(store): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<LedgerEntry>, StatusCode> {
    let user: UserId = user_id.parse().map_err(|_| StatusCode::BAD_REQUEST)?;
    let ledger = store.snapshot().await;

    Ok(Json(LedgerEntry {
        user,
        tracked: ledger.is_tracked(user),
        invites_left: ledger.quota(user),
        inviter: ledger.inviter(user),
        invitees: ledger.invitees_of(user),
    }))
}
