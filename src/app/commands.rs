use super::UiUpdate;
use crate::api::ApiClient;
use crate::state::SessionContext;
use crate::types::{AdminAccount, UploadRecord};
use tokio::sync::mpsc::UnboundedSender;

pub(super) const COMMANDS_HELP: &str = "\
/login <email> <password>        sign in (user, then admin fallback)
/register <email> <password>     create an account
/verify <email> <code>           confirm a verification code
/resend <email>                  resend the verification code
/reset-request <email>           request a password reset code
/reset <email> <code> <newpass>  reset the password
/logout                          drop the session
/prompt                          show the tone prompt
/prompt set <text>               replace the tone prompt
/uploads [limit]                 list upload history
/uploads delete <id>             delete one upload
/admins                          list admin accounts
/admins toggle <id>              activate/deactivate an admin
/watch                           refresh uploads+admins periodically
/unwatch                         stop the periodic refresh
/health                          backend and RAG health
/new                             start a fresh conversation
/quit                            exit";

fn notify(update_tx: &UnboundedSender<UiUpdate>, text: impl Into<String>) {
    let _ = update_tx.send(UiUpdate::Notice(text.into()));
}

fn notify_error(update_tx: &UnboundedSender<UiUpdate>, text: impl Into<String>) {
    let _ = update_tx.send(UiUpdate::CommandFailed(text.into()));
}

/// `/login` mirrors the login page: try the user endpoint first and fall
/// back to the admin endpoint when the user login is rejected.
pub(super) async fn run_login(
    client: ApiClient,
    update_tx: UnboundedSender<UiUpdate>,
    email: String,
    password: String,
) {
    match client.login(&email, &password).await {
        Ok(envelope) if envelope.is_success() => {
            let data = envelope.data.unwrap_or_default();
            if let Some(token) = data.token {
                let mut session = SessionContext::guest();
                session.login_user(&email, &token);
                let _ = update_tx.send(UiUpdate::SessionChanged(session));
                notify(&update_tx, format!("signed in as {email}"));
                return;
            }
            notify_error(&update_tx, "login succeeded but no token was returned");
        }
        Ok(_) => match client.admin_login(&email, &password).await {
            Ok(envelope) if envelope.is_success() => {
                let data = envelope.data.unwrap_or_default();
                if let Some(token) = data.admin_token {
                    let role = data.role.unwrap_or_else(|| "admin".to_string());
                    let mut session = SessionContext::guest();
                    session.login_admin(&email, &token, &role);
                    let _ = update_tx.send(UiUpdate::SessionChanged(session));
                    notify(&update_tx, format!("signed in as admin {email}"));
                    return;
                }
                notify_error(&update_tx, "admin login succeeded but no token was returned");
            }
            Ok(envelope) => {
                notify_error(&update_tx, envelope.message_or("Invalid email or password."));
            }
            Err(error) => notify_error(&update_tx, error.to_string()),
        },
        Err(error) => notify_error(&update_tx, error.to_string()),
    }
}

pub(super) async fn run_register(
    client: ApiClient,
    update_tx: UnboundedSender<UiUpdate>,
    email: String,
    password: String,
) {
    match client.register(&email, &password).await {
        Ok(envelope) if envelope.is_success() => notify(
            &update_tx,
            envelope.message_or("registered; check your email for a verification code"),
        ),
        Ok(envelope) => notify_error(&update_tx, envelope.message_or("registration failed")),
        Err(error) => notify_error(&update_tx, error.to_string()),
    }
}

pub(super) async fn run_verify(
    client: ApiClient,
    update_tx: UnboundedSender<UiUpdate>,
    email: String,
    code: String,
) {
    match client.verify_email(&email, &code).await {
        Ok(envelope) if envelope.is_success() => {
            notify(&update_tx, envelope.message_or("email verified; you can sign in"))
        }
        Ok(envelope) => notify_error(
            &update_tx,
            envelope.message_or("Invalid or expired verification code."),
        ),
        Err(error) => notify_error(&update_tx, error.to_string()),
    }
}

pub(super) async fn run_resend(
    client: ApiClient,
    update_tx: UnboundedSender<UiUpdate>,
    email: String,
) {
    match client.resend_code(&email).await {
        Ok(envelope) if envelope.is_success() => {
            notify(&update_tx, envelope.message_or("verification code resent"))
        }
        Ok(envelope) => notify_error(&update_tx, envelope.message_or("failed to resend code")),
        Err(error) => notify_error(&update_tx, error.to_string()),
    }
}

pub(super) async fn run_reset_request(
    client: ApiClient,
    update_tx: UnboundedSender<UiUpdate>,
    email: String,
) {
    match client.request_password_reset(&email).await {
        Ok(envelope) if envelope.is_success() => {
            notify(&update_tx, envelope.message_or("reset code sent"))
        }
        Ok(envelope) => notify_error(&update_tx, envelope.message_or("reset request failed")),
        Err(error) => notify_error(&update_tx, error.to_string()),
    }
}

pub(super) async fn run_reset(
    client: ApiClient,
    update_tx: UnboundedSender<UiUpdate>,
    email: String,
    code: String,
    new_password: String,
) {
    match client.reset_password(&email, &code, &new_password).await {
        Ok(envelope) if envelope.is_success() => {
            notify(&update_tx, envelope.message_or("password reset; sign in again"))
        }
        Ok(envelope) => notify_error(&update_tx, envelope.message_or("password reset failed")),
        Err(error) => notify_error(&update_tx, error.to_string()),
    }
}

pub(super) async fn run_prompt_show(client: ApiClient, update_tx: UnboundedSender<UiUpdate>) {
    match client.get_prompt().await {
        Ok(prompt) => notify(&update_tx, format!("tone prompt:\n{prompt}")),
        Err(error) => notify_error(&update_tx, error.to_string()),
    }
}

pub(super) async fn run_prompt_set(
    client: ApiClient,
    update_tx: UnboundedSender<UiUpdate>,
    prompt: String,
) {
    match client.update_prompt(&prompt).await {
        Ok(envelope) if envelope.is_success() => {
            notify(&update_tx, envelope.message_or("tone prompt saved"))
        }
        Ok(envelope) => notify_error(&update_tx, envelope.message_or("failed to save prompt")),
        Err(error) => notify_error(&update_tx, error.to_string()),
    }
}

pub(super) async fn run_uploads(
    client: ApiClient,
    update_tx: UnboundedSender<UiUpdate>,
    limit: usize,
) {
    match client.get_upload_history(limit).await {
        Ok(uploads) => notify(&update_tx, format_upload_history(&uploads)),
        Err(error) => notify_error(&update_tx, error.to_string()),
    }
}

pub(super) async fn run_upload_delete(
    client: ApiClient,
    update_tx: UnboundedSender<UiUpdate>,
    upload_id: i64,
) {
    match client.delete_upload(upload_id).await {
        Ok(envelope) if envelope.is_success() => {
            notify(&update_tx, envelope.message_or("upload deleted"))
        }
        Ok(envelope) => notify_error(&update_tx, envelope.message_or("failed to delete upload")),
        Err(error) => notify_error(&update_tx, error.to_string()),
    }
}

pub(super) async fn run_admins(
    client: ApiClient,
    update_tx: UnboundedSender<UiUpdate>,
    session: SessionContext,
) {
    match client.list_admins(&session).await {
        Ok(admins) => notify(&update_tx, format_admin_list(&admins)),
        Err(error) => notify_error(&update_tx, error.to_string()),
    }
}

pub(super) async fn run_admin_toggle(
    client: ApiClient,
    update_tx: UnboundedSender<UiUpdate>,
    session: SessionContext,
    target_admin_id: i64,
) {
    match client.toggle_admin_status(&session, target_admin_id).await {
        Ok(message) => notify(&update_tx, message),
        Err(error) => notify_error(&update_tx, error.to_string()),
    }
}

pub(super) async fn run_health(client: ApiClient, update_tx: UnboundedSender<UiUpdate>) {
    let health = client.health().await;
    let rag = client.rag_health().await;
    let mut lines = Vec::new();
    match health {
        Ok(value) => lines.push(format!("health: {value}")),
        Err(error) => lines.push(format!("health: unreachable ({error})")),
    }
    match rag {
        Ok(value) => lines.push(format!("rag-health: {value}")),
        Err(error) => lines.push(format!("rag-health: unreachable ({error})")),
    }
    notify(&update_tx, lines.join("\n"));
}

/// One refresh pass of the admin watch: upload history plus admin list.
pub(super) async fn run_watch_pass(
    client: ApiClient,
    update_tx: UnboundedSender<UiUpdate>,
    session: SessionContext,
    limit: usize,
) {
    match client.get_upload_history(limit).await {
        Ok(uploads) => notify(&update_tx, format_upload_history(&uploads)),
        Err(error) => notify_error(&update_tx, format!("watch: {error}")),
    }
    if session.is_admin() {
        match client.list_admins(&session).await {
            Ok(admins) => notify(&update_tx, format_admin_list(&admins)),
            Err(error) => notify_error(&update_tx, format!("watch: {error}")),
        }
    }
}

pub(super) fn format_upload_history(uploads: &[UploadRecord]) -> String {
    if uploads.is_empty() {
        return "upload history: empty".to_string();
    }
    let mut lines = vec![format!("upload history ({} entries):", uploads.len())];
    for upload in uploads {
        let extras = match (upload.chunks, upload.duration) {
            (Some(chunks), _) => format!(", {chunks} chunks"),
            (None, Some(duration)) => format!(", {duration:.1}s"),
            (None, None) => String::new(),
        };
        lines.push(format!(
            "  #{} {} [{}] {} {}{extras}",
            upload.id, upload.filename, upload.file_type, upload.upload_type, upload.status
        ));
    }
    lines.join("\n")
}

pub(super) fn format_admin_list(admins: &[AdminAccount]) -> String {
    if admins.is_empty() {
        return "admin accounts: none".to_string();
    }
    let mut lines = vec![format!("admin accounts ({}):", admins.len())];
    for admin in admins {
        let state = if admin.is_active { "active" } else { "inactive" };
        let last_login = admin.last_login.as_deref().unwrap_or("never");
        lines.push(format!(
            "  #{} {} <{}> {} {state}, last login {last_login}",
            admin.id, admin.username, admin.email, admin.role
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(id: i64, chunks: Option<i64>, duration: Option<f64>) -> UploadRecord {
        UploadRecord {
            id,
            filename: format!("file-{id}.docx"),
            file_type: "docx".to_string(),
            upload_type: "uploaded".to_string(),
            status: "processed".to_string(),
            chunks,
            duration,
            created_at: "2025-11-02T10:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_format_upload_history_handles_optionals() {
        let rendered = format_upload_history(&[
            upload(1, Some(12), None),
            upload(2, None, Some(3.25)),
            upload(3, None, None),
        ]);
        assert!(rendered.contains("#1 file-1.docx"));
        assert!(rendered.contains("12 chunks"));
        assert!(rendered.contains("3.2s"));
        assert!(rendered.lines().count() == 4);
    }

    #[test]
    fn test_format_upload_history_empty() {
        assert_eq!(format_upload_history(&[]), "upload history: empty");
    }

    #[test]
    fn test_format_admin_list_marks_inactive() {
        let admins = vec![AdminAccount {
            id: 2,
            username: "ops".to_string(),
            email: "ops@theneutralai.com".to_string(),
            role: "admin".to_string(),
            is_active: false,
            created_at: "2025-01-01T00:00:00Z".to_string(),
            last_login: None,
        }];
        let rendered = format_admin_list(&admins);
        assert!(rendered.contains("inactive"));
        assert!(rendered.contains("last login never"));
    }
}
