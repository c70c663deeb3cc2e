/// Explicit session state, passed to whatever needs it.
///
/// The browser client kept auth flags in ambient localStorage lookups; here
/// the session is one value with a clear lifecycle: built by a successful
/// login, cleared on logout, never read from globals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    identity: Option<Identity>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Identity {
    User {
        email: String,
        token: String,
    },
    Admin {
        email: String,
        token: String,
        role: String,
        admin_id: i64,
    },
}

/// The backend does not yet return the caller's admin id with the login
/// envelope; the dashboard contract pins it to 1.
const DEFAULT_ADMIN_ID: i64 = 1;

impl SessionContext {
    pub fn guest() -> Self {
        Self::default()
    }

    pub fn login_user(&mut self, email: &str, token: &str) {
        self.identity = Some(Identity::User {
            email: email.to_string(),
            token: token.to_string(),
        });
    }

    pub fn login_admin(&mut self, email: &str, token: &str, role: &str) {
        self.identity = Some(Identity::Admin {
            email: email.to_string(),
            token: token.to_string(),
            role: role.to_string(),
            admin_id: DEFAULT_ADMIN_ID,
        });
    }

    /// Logout. Every token and identity field is dropped at once.
    pub fn clear(&mut self) {
        self.identity = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.identity, Some(Identity::Admin { .. }))
    }

    pub fn email(&self) -> Option<&str> {
        match &self.identity {
            Some(Identity::User { email, .. }) | Some(Identity::Admin { email, .. }) => {
                Some(email.as_str())
            }
            None => None,
        }
    }

    pub fn admin_token(&self) -> Option<&str> {
        match &self.identity {
            Some(Identity::Admin { token, .. }) => Some(token.as_str()),
            _ => None,
        }
    }

    pub fn admin_id(&self) -> Option<i64> {
        match &self.identity {
            Some(Identity::Admin { admin_id, .. }) => Some(*admin_id),
            _ => None,
        }
    }

    /// Stream correlation id sent with every chat request, `user-<email>`
    /// for a signed-in user and `user-guest` otherwise.
    pub fn thread_id(&self) -> String {
        format!("user-{}", self.email().unwrap_or("guest"))
    }

    /// One-line summary for the status bar.
    pub fn describe(&self) -> String {
        match &self.identity {
            None => "guest".to_string(),
            Some(Identity::User { email, .. }) => email.clone(),
            Some(Identity::Admin { email, role, .. }) => format!("{email} ({role})"),
        }
    }
}
