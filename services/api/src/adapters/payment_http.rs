//! services/api/src/adapters/payment_http.rs
//!
//! Adapter for the remote payment service, implementing the `PaymentTransport` port.
//!
//! A charge is not idempotent on our side, so it is only retried when the
//! connection was never established. Every attempt carries the caller's
//! idempotency key so the service can deduplicate whatever else slips through.

use crate::adapters::retry::{port_error, with_retry_when, RetryPolicy};
use access_core::{ChargeOutcome, PaymentTransport, Plan, PortError, PortResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

#[derive(Serialize)]
struct ChargeRequest {
    plan: Plan,
}

#[derive(Deserialize)]
struct ChargeResponse {
    status: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Clone)]
pub struct HttpPaymentAdapter {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HttpPaymentAdapter {
    pub fn new(client: Client, base_url: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            retry,
        }
    }
}

#[async_trait]
impl PaymentTransport for HttpPaymentAdapter {
    async fn charge(&self, plan: Plan, idempotency_key: Uuid) -> PortResult<ChargeOutcome> {
        let url = format!("{}/charge", self.base_url);
        let (client, url) = (&self.client, url.as_str());
        let key = idempotency_key.to_string();
        let key = key.as_str();
        let body = ChargeRequest { plan };
        let body = &body;

        let response: ChargeResponse = with_retry_when(
            &self.retry,
            "charge",
            PortError::is_undelivered,
            move || async move {
                let response = client
                    .post(url)
                    .header(IDEMPOTENCY_HEADER, key)
                    .json(body)
                    .send()
                    .await
                    .map_err(port_error)?;
                if response.status().is_server_error() {
                    return Err(PortError::Transport(format!(
                        "payment service returned {}",
                        response.status()
                    )));
                }
                response.json::<ChargeResponse>().await.map_err(|e| {
                    PortError::Unexpected(format!("unreadable payment response: {}", e))
                })
            },
        )
        .await?;

        match response.status.as_str() {
            "succeeded" | "success" => Ok(ChargeOutcome::Succeeded),
            other => Ok(ChargeOutcome::Declined {
                reason: response.reason.unwrap_or_else(|| other.to_string()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn quick_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
        }
    }

    /// A payment service that counts every charge it captures.
    fn counting_service(captures: Arc<AtomicU32>, first_delay: Duration, status: u16) -> Router {
        Router::new().route(
            "/charge",
            post(move || {
                let captures = captures.clone();
                async move {
                    if captures.fetch_add(1, Ordering::SeqCst) == 0 {
                        tokio::time::sleep(first_delay).await;
                    }
                    let code = axum::http::StatusCode::from_u16(status).unwrap();
                    (code, Json(json!({ "status": "succeeded" })))
                }
            }),
        )
    }

    #[tokio::test]
    async fn annual_plan_is_sent_and_success_reported() {
        let router = Router::new().route(
            "/charge",
            post(|Json(body): Json<Value>| async move {
                if body["plan"] == "annual" {
                    Json(json!({ "status": "succeeded" }))
                } else {
                    Json(json!({ "status": "declined", "reason": "wrong plan" }))
                }
            }),
        );
        let payments = HttpPaymentAdapter::new(Client::new(), serve(router).await, quick_retry());

        assert_eq!(
            payments.charge(Plan::Annual, Uuid::new_v4()).await,
            Ok(ChargeOutcome::Succeeded)
        );
        assert_eq!(
            payments.charge(Plan::Monthly, Uuid::new_v4()).await,
            Ok(ChargeOutcome::Declined {
                reason: "wrong plan".into()
            })
        );
    }

    #[tokio::test]
    async fn idempotency_key_is_sent_with_the_charge() {
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let recorder = seen.clone();
        let router = Router::new().route(
            "/charge",
            post(move |headers: HeaderMap| {
                let recorder = recorder.clone();
                async move {
                    if let Some(key) = headers.get(IDEMPOTENCY_HEADER) {
                        recorder
                            .lock()
                            .unwrap()
                            .push(key.to_str().unwrap().to_string());
                    }
                    Json(json!({ "status": "succeeded" }))
                }
            }),
        );
        let payments = HttpPaymentAdapter::new(Client::new(), serve(router).await, quick_retry());
        let key = Uuid::new_v4();

        payments.charge(Plan::Monthly, key).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![key.to_string()]);
    }

    #[tokio::test]
    async fn server_errors_are_not_charged_twice() {
        let captures = Arc::new(AtomicU32::new(0));
        let router = counting_service(captures.clone(), Duration::ZERO, 502);
        let payments = HttpPaymentAdapter::new(Client::new(), serve(router).await, quick_retry());

        let err = payments
            .charge(Plan::Monthly, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Transport(_)));
        assert_eq!(captures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_answer_is_not_charged_twice() {
        let captures = Arc::new(AtomicU32::new(0));
        let router = counting_service(captures.clone(), Duration::from_millis(300), 200);
        let client = Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        let payments = HttpPaymentAdapter::new(client, serve(router).await, quick_retry());

        let outcome = payments.charge(Plan::Annual, Uuid::new_v4()).await;
        assert_eq!(outcome, Err(PortError::Timeout));

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(captures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refused_connection_is_retried_then_reported() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let payments =
            HttpPaymentAdapter::new(Client::new(), format!("http://{}", addr), quick_retry());
        let err = payments
            .charge(Plan::Monthly, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(err.is_undelivered());
    }
}
