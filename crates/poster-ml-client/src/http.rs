//! Shared HTTP plumbing for the Google REST clients.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::auth::AccessTokenSource;
use crate::error::{MlClientError, MlResult};

pub(crate) fn build_client(timeout: Duration) -> MlResult<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(concat!("poster-ml-client/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(MlClientError::Network)
}

/// POST `body` as JSON with a bearer token and decode the JSON response.
///
/// A 401 invalidates the token and retries once.
pub(crate) async fn post_json<B, R>(
    http: &Client,
    tokens: &Arc<dyn AccessTokenSource>,
    url: &str,
    body: &B,
) -> MlResult<R>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let token = tokens.access_token().await?;
    let mut response = http.post(url).bearer_auth(&token).json(body).send().await?;

    if response.status() == StatusCode::UNAUTHORIZED {
        debug!(url, "Access token rejected, refreshing");
        tokens.invalidate().await;
        let token = tokens.access_token().await?;
        response = http.post(url).bearer_auth(&token).json(body).send().await?;
    }

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(MlClientError::Http {
            status: status.as_u16(),
            body,
        });
    }

    Ok(response.json().await?)
}
