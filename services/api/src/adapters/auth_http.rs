//! services/api/src/adapters/auth_http.rs
//!
//! This module contains the adapter for the remote authentication service.
//! It implements the `AuthTransport` port from the `core` crate.

use crate::adapters::retry::{port_error, with_retry, RetryPolicy};
use access_core::{AuthTransport, CredentialCheck, OtpCheck, PortError, PortResult};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

const SUCCESS: &str = "success";

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
struct InitiateLoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct VerifyOtpRequest<'a> {
    email: &'a str,
    otp: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    status: String,
    #[serde(default, alias = "name")]
    display_name: Option<String>,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `AuthTransport` port over HTTP.
#[derive(Clone)]
pub struct HttpAuthAdapter {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HttpAuthAdapter {
    /// Creates a new `HttpAuthAdapter`. Timeouts are configured on `client`.
    pub fn new(client: Client, base_url: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            retry,
        }
    }

    async fn post_for_status<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> PortResult<StatusResponse> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let (client, url) = (&self.client, url.as_str());
        with_retry(&self.retry, endpoint, move || async move {
            let response = client
                .post(url)
                .json(body)
                .send()
                .await
                .map_err(port_error)?;
            read_status(response).await
        })
        .await
    }
}

/// Reads a `{ status }` body. Server errors count as transport failures; any other
/// response without a readable status is a rejection carrying the HTTP code.
async fn read_status(response: reqwest::Response) -> PortResult<StatusResponse> {
    let code = response.status();
    debug!("Auth service answered {}.", code);
    if code.is_server_error() {
        return Err(PortError::Transport(format!("auth service returned {}", code)));
    }
    match response.json::<StatusResponse>().await {
        Ok(body) => Ok(body),
        Err(_) if code != StatusCode::OK => Ok(StatusResponse {
            status: code.as_u16().to_string(),
            display_name: None,
        }),
        Err(e) => Err(PortError::Unexpected(format!("unreadable auth response: {}", e))),
    }
}

//=========================================================================================
// `AuthTransport` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthTransport for HttpAuthAdapter {
    async fn initiate_login(&self, email: &str, password: &str) -> PortResult<CredentialCheck> {
        let body = InitiateLoginRequest { email, password };
        let response = self.post_for_status("initiate-login", &body).await?;
        if response.status == SUCCESS {
            Ok(CredentialCheck::Accepted)
        } else {
            Ok(CredentialCheck::Rejected {
                status: response.status,
            })
        }
    }

    async fn verify_otp(&self, email: &str, otp: u32) -> PortResult<OtpCheck> {
        let body = VerifyOtpRequest { email, otp };
        let response = self.post_for_status("verify-otp", &body).await?;
        if response.status == SUCCESS {
            Ok(OtpCheck::Verified {
                display_name: response.display_name,
            })
        } else {
            Ok(OtpCheck::Rejected {
                status: response.status,
            })
        }
    }
}
