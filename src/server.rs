//! Webhook that receives inbound SMS from Twilio.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use crate::bot::{Engine, Inbound, SmsClient};

pub struct AppState {
    pub engine: Engine,
    pub sms: SmsClient,
}

/// The fields we use from Twilio's form post. Everything else is ignored.
#[derive(Debug, Deserialize)]
pub struct InboundSms {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "Body", default)]
    pub body: String,
}

/// Build the axum Router. Used by `main` and by integration tests.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/receivemsg", post(receive_msg))
        .route("/health", get(health))
        .with_state(state)
}

/// Runs for every SMS Twilio forwards to us. Always answers 200 so Twilio
/// never retries; the body says what happened.
async fn receive_msg(State(state): State<Arc<AppState>>, Form(sms): Form<InboundSms>) -> (StatusCode, &'static str) {
    let inbound = Inbound { from: sms.from, body: sms.body };
    let receipt = state.engine.handle(&inbound);
    state.sms.deliver(receipt.outbox).await;
    (StatusCode::OK, receipt.ack.as_str())
}

async fn health() -> &'static str {
    "ok"
}
