// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Verification notifications.
//!
//! Two messages follow a successful submission: an alert to the operator
//! listing the profile and document links, and an acknowledgement to the
//! submitter. They are sent from a detached task with bounded retries and
//! never affect the outcome of the submission itself.

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{SocialMedia, UserProfile};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything the operator needs to review a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationNotice {
    pub user_id: String,
    pub user_email: String,
    pub user_name: String,
    pub user_location: String,
    pub phone: String,
    pub description: String,
    pub social_media: SocialMedia,
    pub camera_document_url: Option<String>,
    pub commerce_document_url: Option<String>,
}

impl VerificationNotice {
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            user_id: profile.user_id.clone(),
            user_email: profile.email.clone(),
            user_name: profile.full_name.clone(),
            user_location: profile.location.clone(),
            phone: profile.phone.clone(),
            description: profile.description.clone(),
            social_media: profile.social_media.clone(),
            camera_document_url: profile.documents.camera_document_url.clone(),
            commerce_document_url: profile.documents.commerce_document_url.clone(),
        }
    }

    /// Plain-text body of the operator alert.
    pub fn operator_body(&self) -> String {
        let mut body = String::new();
        let _ = writeln!(body, "New profile verification request");
        let _ = writeln!(body);
        let _ = writeln!(body, "Name: {}", self.user_name);
        let _ = writeln!(body, "Email: {}", self.user_email);
        let _ = writeln!(body, "Location: {}", self.user_location);
        let phone = if self.phone.is_empty() {
            "not provided"
        } else {
            &self.phone
        };
        let _ = writeln!(body, "Phone: {}", phone);
        let _ = writeln!(body, "Description: {}", self.description);
        for (network, url) in self.social_media.links() {
            let _ = writeln!(body, "{network}: {url}");
        }
        if let Some(url) = &self.camera_document_url {
            let _ = writeln!(body, "Camera document: {url}");
        }
        if let Some(url) = &self.commerce_document_url {
            let _ = writeln!(body, "Commerce document: {url}");
        }
        body
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Alert the operator about a new request.
    async fn send_verification_notification(
        &self,
        notice: &VerificationNotice,
    ) -> Result<(), AppError>;

    /// Tell the submitter their request was received.
    async fn send_user_confirmation(&self, email: &str, name: &str) -> Result<(), AppError>;
}

// ─── Implementations ─────────────────────────────────────────

/// Writes notifications to the structured log. Used when no webhook is set.
pub struct LogNotifier {
    operator_email: String,
}

impl LogNotifier {
    pub fn new(operator_email: impl Into<String>) -> Self {
        Self {
            operator_email: operator_email.into(),
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_verification_notification(
        &self,
        notice: &VerificationNotice,
    ) -> Result<(), AppError> {
        tracing::info!(
            to = %self.operator_email,
            user_id = %notice.user_id,
            body = %notice.operator_body(),
            "Verification request notification"
        );
        Ok(())
    }

    async fn send_user_confirmation(&self, email: &str, name: &str) -> Result<(), AppError> {
        tracing::info!(to = %email, name = %name, "Verification request acknowledgement");
        Ok(())
    }
}

/// Outgoing e-mail request understood by the mail relay webhook.
#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    to: &'a str,
    subject: &'a str,
    body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<&'a VerificationNotice>,
}

/// POSTs notifications as JSON to a mail relay.
pub struct WebhookNotifier {
    http_client: reqwest::Client,
    url: String,
    operator_email: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, operator_email: impl Into<String>) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .context("failed building notification HTTP client")?;
        Ok(Self {
            http_client,
            url: url.into(),
            operator_email: operator_email.into(),
        })
    }

    async fn post(&self, request: &MailRequest<'_>) -> Result<(), AppError> {
        let response = self
            .http_client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("notification request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "notification webhook returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send_verification_notification(
        &self,
        notice: &VerificationNotice,
    ) -> Result<(), AppError> {
        self.post(&MailRequest {
            to: &self.operator_email,
            subject: "New profile verification request",
            body: notice.operator_body(),
            notice: Some(notice),
        })
        .await
    }

    async fn send_user_confirmation(&self, email: &str, name: &str) -> Result<(), AppError> {
        self.post(&MailRequest {
            to: email,
            subject: "We received your verification request",
            body: format!(
                "Hello {name},\n\nWe received your profile verification request. \
                 Our team will review your documents and get back to you soon.\n"
            ),
            notice: None,
        })
        .await
    }
}

/// Pick the notifier the configuration asks for.
pub fn notifier_from_config(config: &Config) -> anyhow::Result<Arc<dyn Notifier>> {
    let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url, &config.operator_email)?),
        None => Arc::new(LogNotifier::new(&config.operator_email)),
    };
    Ok(notifier)
}

// ─── Dispatch ────────────────────────────────────────────────

/// What happened to the two messages of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NotificationReport {
    pub operator_notified: bool,
    pub user_notified: bool,
}

/// Sends notifications off the request path with bounded retries.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    attempts: u32,
    backoff: Duration,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, attempts: u32, backoff: Duration) -> Self {
        Self {
            notifier,
            attempts: attempts.max(1),
            backoff,
        }
    }

    /// Send both messages on a detached task. The handle may be awaited (tests)
    /// or dropped.
    pub fn dispatch(&self, notice: VerificationNotice) -> JoinHandle<NotificationReport> {
        let this = self.clone();
        tokio::spawn(async move {
            let operator_notified = this
                .with_retries("operator", || {
                    this.notifier.send_verification_notification(&notice)
                })
                .await;
            let user_notified = this
                .with_retries("user", || {
                    this.notifier
                        .send_user_confirmation(&notice.user_email, &notice.user_name)
                })
                .await;

            NotificationReport {
                operator_notified,
                user_notified,
            }
        })
    }

    async fn with_retries<F, Fut>(&self, recipient: &str, mut send: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<(), AppError>>,
    {
        for attempt in 1..=self.attempts {
            match send().await {
                Ok(()) => return true,
                Err(e) => {
                    tracing::warn!(
                        recipient,
                        attempt,
                        max_attempts = self.attempts,
                        error = %e,
                        "Verification notification failed"
                    );
                    if attempt < self.attempts {
                        tokio::time::sleep(self.backoff * attempt).await;
                    }
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyNotifier {
        failures_left: AtomicU32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Notifier for FlakyNotifier {
        async fn send_verification_notification(
            &self,
            _notice: &VerificationNotice,
        ) -> Result<(), AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(AppError::Internal(anyhow::anyhow!("smtp down")));
            }
            Ok(())
        }

        async fn send_user_confirmation(&self, _email: &str, _name: &str) -> Result<(), AppError> {
            Err(AppError::Internal(anyhow::anyhow!("mailbox full")))
        }
    }

    fn notice() -> VerificationNotice {
        VerificationNotice {
            user_id: "u1".to_string(),
            user_email: "ana@example.com".to_string(),
            user_name: "Ana".to_string(),
            user_location: "Medellín".to_string(),
            phone: String::new(),
            description: "Fundación".to_string(),
            social_media: SocialMedia::default(),
            camera_document_url: Some("memory://c.pdf".to_string()),
            commerce_document_url: None,
        }
    }

    #[tokio::test]
    async fn test_dispatch_retries_then_reports() {
        let notifier = Arc::new(FlakyNotifier {
            failures_left: AtomicU32::new(2),
            calls: AtomicU32::new(0),
        });
        let dispatcher =
            NotificationDispatcher::new(notifier.clone(), 3, Duration::from_millis(1));

        let report = dispatcher.dispatch(notice()).await.unwrap();

        assert!(report.operator_notified);
        assert!(!report.user_notified);
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_operator_body_lists_documents() {
        let body = notice().operator_body();
        assert!(body.contains("Phone: not provided"));
        assert!(body.contains("Camera document: memory://c.pdf"));
        assert!(!body.contains("Commerce document"));
    }
}
