use super::notification::Notification;
use crate::config::NotifySettings;
use crate::error::{ConfigError, NotifyError};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::timeout::Timeout;
use tower::{Service, ServiceBuilder};

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

/// Posts `{"content": message}` to a chat webhook. Non-2xx responses are errors.
#[derive(Debug, Clone)]
pub struct WebhookService {
    client: reqwest::Client,
    url: Arc<str>,
}

impl WebhookService {
    pub fn new(url: impl Into<Arc<str>>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl Service<Notification> for WebhookService {
    type Response = ();
    type Error = NotifyError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Notification) -> Self::Future {
        let client = self.client.clone();
        let url = self.url.clone();
        Box::pin(async move {
            client
                .post(url.as_ref())
                .json(&WebhookPayload {
                    content: &request.message,
                })
                .send()
                .await?
                .error_for_status()?;
            Ok(())
        })
    }
}

/// The webhook service wrapped in the transport's request timeout.
pub fn webhook_transport(settings: &NotifySettings) -> Result<Timeout<WebhookService>, ConfigError> {
    let url = settings
        .webhook_url
        .as_deref()
        .filter(|url| !url.is_empty())
        .ok_or(ConfigError::MissingWebhook)?;
    let service = WebhookService::new(url).map_err(|err| ConfigError::Invalid {
        key: "notify.webhook_url",
        reason: err.to_string(),
    })?;
    Ok(ServiceBuilder::new()
        .timeout(settings.timeout())
        .service(service))
}
