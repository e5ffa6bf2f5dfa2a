//! reCAPTCHA verification against Google's siteverify endpoint.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

const SITEVERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Human-verification provider. The gateway rejects the request when
/// verification fails; tests stub this out.
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<bool>;
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
}

pub struct RecaptchaClient {
    http: reqwest::Client,
    secret: String,
}

impl RecaptchaClient {
    pub fn new(secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret,
        }
    }
}

#[async_trait]
impl CaptchaVerifier for RecaptchaClient {
    async fn verify(&self, token: &str) -> Result<bool> {
        let response: SiteVerifyResponse = self
            .http
            .post(SITEVERIFY_URL)
            .query(&[("secret", self.secret.as_str()), ("response", token)])
            .send()
            .await
            .context("siteverify request failed")?
            .json()
            .await
            .context("siteverify response malformed")?;

        Ok(response.success)
    }
}
