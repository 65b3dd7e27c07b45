use axum::{Extension, response::Json};
use serde_json::{Value, json};

use crate::{management::Session, server::AppState};

pub async fn health(Extension(app): Extension<AppState>) -> Json<Value> {
    let session = match *app.session.lock().await {
        Session::Unauthenticated => "unauthenticated",
        Session::PendingCode { .. } => "pending",
        Session::Authenticated { .. } => "authenticated",
    };

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "session": session,
    }))
}
