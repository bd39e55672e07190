use std::time::Duration;

use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use stk_schemas::{ItemSnapshot, ItemUpdate, OptionBulkWrite, OptionSingleWrite, OptionWriteResponse};

use crate::{BackendError, InventoryBackend};

/// Longest error body echoed back into a [`BackendError::Api`] message.
const MAX_ERROR_BODY: usize = 512;

/// REST/JSON inventory backend.
///
/// The bearer token is resolved by the caller (CLI, from the env var named in
/// config) and passed in; it is never logged.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        token: Option<String>,
    ) -> Result<Self, BackendError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| BackendError::Transport(format!("invalid base url {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::Transport(format!(
                "base url cannot carry a path: {base_url}"
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(format!("http client build failed: {e}")))?;
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    /// `{base}/api/<segments..>`, each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                BackendError::Transport(format!("base url cannot carry a path: {}", self.base_url))
            })?;
            path.pop_if_empty().push("api").extend(segments);
        }
        Ok(url)
    }

    async fn send<T, B>(&self, method: Method, url: Url, body: Option<&B>) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        debug!(%method, path = url.path(), "backend request");

        let mut req = self.http.request(method.clone(), url.clone());
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| BackendError::Transport(format!("reading response body: {e}")))?;

        if !status.is_success() {
            let message = error_message(status, &text);
            warn!(%method, path = url.path(), status = status.as_u16(), %message, "backend request failed");
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| BackendError::Decode(format!("{} {}: {e}", method, url.path())))
    }
}

/// Best-effort message from an error body: `{"message": ..}` or
/// `{"error": ..}` when JSON, otherwise the (truncated) text itself.
fn error_message(status: StatusCode, body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: Option<String>,
        error: Option<String>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(msg) = parsed.message.or(parsed.error) {
            return msg;
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY).collect()
}

#[async_trait::async_trait]
impl InventoryBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn get_item(&self, item_id: &str) -> Result<ItemSnapshot, BackendError> {
        let url = self.url(&["menu-items", item_id])?;
        self.send::<_, ()>(Method::GET, url, None).await
    }

    async fn update_item(
        &self,
        item_id: &str,
        update: &ItemUpdate,
    ) -> Result<ItemSnapshot, BackendError> {
        let url = self.url(&["menu-items", item_id])?;
        self.send(Method::PATCH, url, Some(update)).await
    }

    async fn update_single_option_quantity(
        &self,
        group_id: &str,
        option_id: &str,
        write: &OptionSingleWrite,
    ) -> Result<OptionWriteResponse, BackendError> {
        let url = self.url(&["option-groups", group_id, "options", option_id, "stock"])?;
        self.send(Method::PATCH, url, Some(write)).await
    }

    async fn update_option_quantities(
        &self,
        group_id: &str,
        write: &OptionBulkWrite,
    ) -> Result<OptionWriteResponse, BackendError> {
        let url = self.url(&["option-groups", group_id, "stock"])?;
        self.send(Method::PATCH, url, Some(write)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base: &str) -> HttpBackend {
        HttpBackend::new(base, Duration::from_secs(1), None).unwrap()
    }

    #[test]
    fn urls_are_rooted_under_api_and_encoded() {
        let b = backend("http://localhost:9000");
        assert_eq!(
            b.url(&["menu-items", "item 1"]).unwrap().as_str(),
            "http://localhost:9000/api/menu-items/item%201"
        );

        let b = backend("http://localhost:9000/admin/");
        assert_eq!(
            b.url(&["option-groups", "g/1", "stock"]).unwrap().as_str(),
            "http://localhost:9000/admin/api/option-groups/g%2F1/stock"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            HttpBackend::new("not a url", Duration::from_secs(1), None),
            Err(BackendError::Transport(_))
        ));
        assert!(HttpBackend::new("mailto:ops@example.test", Duration::from_secs(1), None).is_err());
    }

    #[test]
    fn error_message_prefers_json_fields() {
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, r#"{"message":"bad qty"}"#),
            "bad qty"
        );
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, r#"{"error":"nope"}"#),
            "nope"
        );
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, "  upstream down "), "upstream down");
        assert_eq!(error_message(StatusCode::NOT_FOUND, ""), "Not Found");
    }
}
