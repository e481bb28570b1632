use super::{ActionLayer, AnalysisPayload};
use crate::content::Feed;
use hateraide_common::error::{ClientError, ClientResult, DecodeError, HttpError, TransportError};
use hateraide_common::http_client::HttpClient;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::Instrument;
use url::Url;

/// Fetch the batch analysis payload
///
/// One GET per view activation. Non-success statuses surface as
/// [`ClientError::Http`]; the caller decides whether that matters.
pub async fn fetch_analysis_payload(
    client: &impl HttpClient,
    url: &Url,
) -> ClientResult<AnalysisPayload> {
    get_json(client, url)
        .instrument(tracing::debug_span!("fetch_analysis_payload", %url))
        .await
}

/// Fetch the actions the backend has already applied
///
/// Returns the backend's map of item id to action, covering decisions made
/// before the current session started.
pub async fn fetch_applied_actions(client: &impl HttpClient, url: &Url) -> ClientResult<ActionLayer> {
    get_json(client, url)
        .instrument(tracing::debug_span!("fetch_applied_actions", %url))
        .await
}

/// Fetch the mock feed the view renders
pub async fn fetch_feed(client: &impl HttpClient, url: &Url) -> ClientResult<Feed> {
    get_json(client, url)
        .instrument(tracing::debug_span!("fetch_feed", %url))
        .await
}

#[derive(Debug, Deserialize)]
struct Health {
    status: String,
}

/// Ask the backend whether it is up
///
/// `Ok(true)` only for a `{"status": "healthy"}` answer.
pub async fn check_health(client: &impl HttpClient, url: &Url) -> ClientResult<bool> {
    let health: Health = get_json(client, url)
        .instrument(tracing::debug_span!("check_health", %url))
        .await?;
    Ok(health.status == "healthy")
}

async fn get_json<T: DeserializeOwned>(client: &impl HttpClient, url: &Url) -> ClientResult<T> {
    let request = http::Request::builder()
        .method(http::Method::GET)
        .uri(url.as_str())
        .header(http::header::ACCEPT, "application/json")
        .body(Vec::new())
        .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

    let response = client
        .send_http(request)
        .await
        .map_err(ClientError::transport)?;

    let status = response.status();
    let body = response.into_body();
    tracing::debug!(%status, bytes = body.len(), "response received");

    if !status.is_success() {
        return Err(HttpError {
            status,
            body: Some(body.into()),
        }
        .into());
    }

    Ok(serde_json::from_slice(&body).map_err(DecodeError::from)?)
}
