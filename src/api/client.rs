use super::logging::{debug_payload_enabled, emit_debug_payload};
use crate::config::Config;
use crate::state::session::SessionContext;
use crate::types::{
    AdminAccount, AdminListData, ApiEnvelope, AuthData, PromptResponse, UploadHistoryResponse,
    UploadRecord,
};
use crate::util::is_local_backend_url;
use anyhow::{anyhow, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::{json, Value};
use std::pin::Pin;
#[cfg(test)]
use std::sync::Arc;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

pub const DEFAULT_UPLOAD_HISTORY_LIMIT: usize = 20;

#[cfg(test)]
pub trait MockStreamProducer: Send + Sync {
    fn create_mock_stream(&self, query: &str) -> Result<ByteStream>;
}

/// HTTP boundary to the Neutral Chat backend. One streaming endpoint plus
/// the REST glue the auth and admin screens need.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    use_web_search: bool,
    #[cfg(test)]
    mock_stream_producer: Option<Arc<dyn MockStreamProducer>>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            use_web_search: config.use_web_search,
            #[cfg(test)]
            mock_stream_producer: None,
        })
    }

    #[cfg(test)]
    pub fn new_mock(mock_producer: Arc<dyn MockStreamProducer>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "http://localhost:8000".to_string(),
            use_web_search: true,
            mock_stream_producer: Some(mock_producer),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_local_backend(&self) -> bool {
        is_local_backend_url(&self.base_url)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Open the streamed chat POST. The response body is consumed by
    /// `StreamParser`; transport failures surface here as one terminal error.
    pub async fn create_chat_stream(&self, query: &str, thread_id: &str) -> Result<ByteStream> {
        #[cfg(test)]
        {
            if let Some(producer) = &self.mock_stream_producer {
                return producer.create_mock_stream(query);
            }
        }

        let request_url = self.endpoint("/api/chat-stream");
        let payload = json!({
            "query": query,
            "thread_id": thread_id,
            "use_web_search": self.use_web_search,
        });

        if debug_payload_enabled() {
            emit_debug_payload(&request_url, &payload);
        }

        let response = self
            .http
            .post(&request_url)
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?
            .error_for_status()
            .map_err(|error| map_api_request_error(error, &request_url))?;

        let request_url_for_stream = request_url.clone();
        let stream = response.bytes_stream().map(move |item| {
            item.map_err(|error| map_api_request_error(error, &request_url_for_stream))
        });
        Ok(Box::pin(stream))
    }

    // --- auth ---

    pub async fn login(&self, email: &str, password: &str) -> Result<ApiEnvelope<AuthData>> {
        self.post_envelope("/auth/login", &json!({ "email": email, "password": password }))
            .await
    }

    pub async fn admin_login(&self, email: &str, password: &str) -> Result<ApiEnvelope<AuthData>> {
        self.post_envelope("/admin/login", &json!({ "email": email, "password": password }))
            .await
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<ApiEnvelope<AuthData>> {
        self.post_envelope(
            "/auth/register",
            &json!({ "email": email, "password": password }),
        )
        .await
    }

    pub async fn verify_email(&self, email: &str, code: &str) -> Result<ApiEnvelope<AuthData>> {
        self.post_envelope("/auth/verify", &json!({ "email": email, "code": code }))
            .await
    }

    pub async fn resend_code(&self, email: &str) -> Result<ApiEnvelope<AuthData>> {
        self.post_envelope("/auth/resend-code", &json!({ "email": email }))
            .await
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<ApiEnvelope<AuthData>> {
        self.post_envelope("/auth/reset-password-request", &json!({ "email": email }))
            .await
    }

    pub async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<ApiEnvelope<AuthData>> {
        self.post_envelope(
            "/auth/reset-password",
            &json!({ "email": email, "code": code, "new_password": new_password }),
        )
        .await
    }

    // --- tone prompt ---

    pub async fn get_prompt(&self) -> Result<String> {
        let request_url = self.endpoint("/getPrompt");
        let response: PromptResponse = self
            .http
            .get(&request_url)
            .send()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?
            .error_for_status()
            .map_err(|error| map_api_request_error(error, &request_url))?
            .json()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?;
        Ok(response.prompt)
    }

    pub async fn update_prompt(&self, prompt: &str) -> Result<ApiEnvelope<Value>> {
        self.post_envelope("/chngPrompt", &json!({ "prompt": prompt }))
            .await
    }

    // --- upload history ---

    pub async fn get_upload_history(&self, limit: usize) -> Result<Vec<UploadRecord>> {
        let request_url = format!("{}?limit={limit}", self.endpoint("/get-upload-history"));
        let response: UploadHistoryResponse = self
            .http
            .get(&request_url)
            .send()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?
            .error_for_status()
            .map_err(|error| map_api_request_error(error, &request_url))?
            .json()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?;
        Ok(response.uploads)
    }

    pub async fn delete_upload(&self, upload_id: i64) -> Result<ApiEnvelope<Value>> {
        let request_url = format!("{}/{upload_id}", self.endpoint("/delete-upload"));
        let envelope = self
            .http
            .delete(&request_url)
            .send()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?
            .json::<ApiEnvelope<Value>>()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?;
        Ok(envelope)
    }

    // --- admin accounts ---

    pub async fn list_admins(&self, session: &SessionContext) -> Result<Vec<AdminAccount>> {
        let (token, admin_id) = admin_credentials(session)?;
        let request_url = format!(
            "{}?requesting_admin_id={admin_id}",
            self.endpoint("/admin/list")
        );
        let envelope: ApiEnvelope<AdminListData> = self
            .http
            .get(&request_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?
            .json()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?;

        if !envelope.is_success() {
            return Err(anyhow!(envelope.message_or("failed to fetch admin list")));
        }
        Ok(envelope.data.unwrap_or_default().admins)
    }

    pub async fn toggle_admin_status(
        &self,
        session: &SessionContext,
        target_admin_id: i64,
    ) -> Result<String> {
        let (token, admin_id) = admin_credentials(session)?;
        let request_url = format!(
            "{}?requesting_admin_id={admin_id}",
            self.endpoint("/admin/toggle-status")
        );
        let envelope: ApiEnvelope<Value> = self
            .http
            .post(&request_url)
            .bearer_auth(token)
            .header("content-type", "application/json")
            .json(&json!({ "admin_id": target_admin_id }))
            .send()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?
            .json()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?;

        if !envelope.is_success() {
            return Err(anyhow!(
                envelope.message_or("failed to toggle admin status")
            ));
        }
        Ok(envelope.message_or("admin status updated"))
    }

    // --- health ---

    pub async fn health(&self) -> Result<Value> {
        self.get_json("/health").await
    }

    pub async fn rag_health(&self) -> Result<Value> {
        self.get_json("/rag-health").await
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let request_url = self.endpoint(path);
        let value = self
            .http
            .get(&request_url)
            .send()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?
            .error_for_status()
            .map_err(|error| map_api_request_error(error, &request_url))?
            .json::<Value>()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?;
        Ok(value)
    }

    /// POST a JSON body and decode the standard envelope. Non-2xx statuses
    /// still carry an envelope with the backend's message, so the HTTP
    /// status is not treated as fatal here.
    async fn post_envelope<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        payload: &Value,
    ) -> Result<ApiEnvelope<T>> {
        let request_url = self.endpoint(path);

        if debug_payload_enabled() {
            emit_debug_payload(&request_url, payload);
        }

        let envelope = self
            .http
            .post(&request_url)
            .header("content-type", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?
            .json::<ApiEnvelope<T>>()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?;
        Ok(envelope)
    }
}

fn admin_credentials(session: &SessionContext) -> Result<(&str, i64)> {
    match (session.admin_token(), session.admin_id()) {
        (Some(token), Some(admin_id)) => Ok((token, admin_id)),
        _ => Err(anyhow!("admin session required; use /login first")),
    }
}

fn map_api_request_error(error: reqwest::Error, request_url: &str) -> anyhow::Error {
    if error.is_connect() && is_local_backend_url(request_url) {
        return anyhow!(
            "cannot reach local backend '{}': {}. Start the backend or update NEUTRAL_API_URL.",
            request_url,
            error
        );
    }
    if error.is_connect() {
        return anyhow!("cannot reach backend '{}': {}", request_url, error);
    }
    if error.is_timeout() {
        return anyhow!("request to '{}' timed out: {}", request_url, error);
    }
    if let Some(status) = error.status() {
        return anyhow!(
            "backend '{}' returned HTTP {}: {}",
            request_url,
            status,
            error
        );
    }
    anyhow!("request to '{}' failed: {}", request_url, error)
}
