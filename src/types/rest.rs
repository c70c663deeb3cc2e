use serde::{Deserialize, Serialize};

/// Standard `{status, message, data}` envelope the auth and admin endpoints
/// answer with. The prompt and upload-history endpoints reply bare (see
/// `PromptResponse` / `UploadHistoryResponse`).
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiEnvelope<T> {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    pub fn message_or(&self, fallback: &str) -> String {
        self.message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Payload of `/auth/login` and `/admin/login`. Exactly one of `token`
/// (user session) or `admin_token` (admin session) is present on success.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthData {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub admin_token: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptResponse {
    pub prompt: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadHistoryResponse {
    #[serde(default)]
    pub uploads: Vec<UploadRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRecord {
    pub id: i64,
    pub filename: String,
    pub file_type: String,
    pub upload_type: String,
    pub status: String,
    #[serde(default)]
    pub chunks: Option<i64>,
    #[serde(default)]
    pub duration: Option<f64>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminListData {
    #[serde(default)]
    pub admins: Vec<AdminAccount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminAccount {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: String,
    #[serde(default)]
    pub last_login: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_success_and_message_fallback() {
        let env: ApiEnvelope<AuthData> = serde_json::from_str(
            r#"{"status":"success","data":{"token":"abc"}}"#,
        )
        .unwrap();
        assert!(env.is_success());
        assert_eq!(env.message_or("ok"), "ok");
        assert_eq!(env.data.unwrap().token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_envelope_failure_keeps_backend_message() {
        let env: ApiEnvelope<AuthData> = serde_json::from_str(
            r#"{"status":"error","message":"Invalid email or password."}"#,
        )
        .unwrap();
        assert!(!env.is_success());
        assert_eq!(env.message_or("ok"), "Invalid email or password.");
        assert!(env.data.is_none());
    }

    #[test]
    fn test_upload_history_tolerates_missing_optionals() {
        let history: UploadHistoryResponse = serde_json::from_str(
            r#"{"uploads":[{"id":3,"filename":"notes.docx","file_type":"docx",
                "upload_type":"uploaded","status":"processed",
                "created_at":"2025-11-02T10:00:00Z"}]}"#,
        )
        .unwrap();
        assert_eq!(history.uploads.len(), 1);
        assert_eq!(history.uploads[0].chunks, None);
        assert_eq!(history.uploads[0].duration, None);
    }

    #[test]
    fn test_admin_list_decodes_nested_envelope() {
        let env: ApiEnvelope<AdminListData> = serde_json::from_str(
            r#"{"status":"success","data":{"admins":[
                {"id":1,"username":"root","email":"root@theneutralai.com",
                 "role":"superadmin","is_active":true,
                 "created_at":"2025-01-01T00:00:00Z","last_login":null}]}}"#,
        )
        .unwrap();
        let admins = env.data.unwrap().admins;
        assert_eq!(admins.len(), 1);
        assert!(admins[0].is_active);
        assert_eq!(admins[0].last_login, None);
    }
}
