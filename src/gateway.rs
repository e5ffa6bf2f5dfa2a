//! HTTP surface: request validation, human verification, and the two
//! queue endpoints. The dispatch core is invoked only after validation
//! and captcha verification pass.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::faucet::{AdmissionGate, FaucetState, ProcessingEntry};
use crate::recaptcha::CaptchaVerifier;

pub struct AppState {
    pub gate: AdmissionGate,
    pub state: Arc<FaucetState>,
    pub verifier: Arc<dyn CaptchaVerifier>,
}

#[derive(Debug, Deserialize)]
pub struct AddQueueRequest {
    pub account: Option<String>,
    #[serde(rename = "reCaptcha")]
    pub re_captcha: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct QueueStatusResponse {
    pub processing: Vec<ProcessingEntry>,
}

pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/queue/add", post(add_to_queue))
        .route("/queue", get(queue_status))
        .layer(Extension(state))
        .layer(CorsLayer::permissive())
}

fn bad_request(message: &str) -> (StatusCode, Json<MessageResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(MessageResponse {
            message: message.to_string(),
        }),
    )
}

async fn add_to_queue(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<AddQueueRequest>,
) -> (StatusCode, Json<MessageResponse>) {
    let account = match payload.account.as_deref() {
        None | Some("") => return bad_request("Account is required"),
        Some(raw) => match Address::from_str(raw) {
            Ok(account) => account,
            Err(_) => return bad_request("Account is invalid"),
        },
    };

    let re_captcha = match payload.re_captcha.as_deref() {
        None | Some("") => return bad_request("reCaptcha is required"),
        Some(token) => token,
    };

    match state.verifier.verify(re_captcha).await {
        Ok(true) => {}
        Ok(false) => return bad_request("reCaptcha is invalid"),
        Err(e) => {
            log::warn!("Captcha verification failed: {:#}", e);
            return bad_request("reCaptcha verification failed. Try again later.");
        }
    }

    match state.gate.try_admit(account).await {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "Request added to the queue".to_string(),
            }),
        ),
        Err(reason) => {
            log::info!("Admission rejected for {:?}: {}", account, reason);
            bad_request(&reason.to_string())
        }
    }
}

async fn queue_status(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<QueueStatusResponse> {
    Json(QueueStatusResponse {
        processing: state.state.processing_snapshot(),
    })
}
