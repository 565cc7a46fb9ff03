//! Session context: who is logged in, with which token and role.
//!
//! The context is passed explicitly to everything that issues authenticated
//! requests. [`SessionContext::teardown`] is the only way credentials are
//! cleared, whether the user logs out or the backend answers 401/403.

use thiserror::Error;

use crate::api::{ApiClient, ApiError, LoginReply};
use crate::error::CoreError;
use crate::status;
use crate::store::{keys, KeyValueStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Founder,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Founder => "founder",
            UserRole::Admin => "admin",
        }
    }

    /// Exact match only: `"Admin"` is not a role.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "founder" => Some(UserRole::Founder),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            UserRole::Founder => "Founder",
            UserRole::Admin => "Admin",
        }
    }

    /// CLI hint shown when a screen needs this role and there is no session.
    pub fn login_hint(&self) -> &'static str {
        match self {
            UserRole::Founder => "tr4ction login founder --startup <name> --founder <name>",
            UserRole::Admin => "tr4ction login admin --username <name>",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub role: UserRole,
    pub founder_name: Option<String>,
    pub startup_name: Option<String>,
}

#[derive(Error, Debug)]
pub enum LoginError {
    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] CoreError),
}

impl LoginError {
    pub fn user_message(&self) -> String {
        match self {
            LoginError::Invalid(message) => message.clone(),
            LoginError::Api(ApiError::Auth(_)) => status::INVALID_CREDENTIALS.to_string(),
            LoginError::Api(err) => status::describe(err),
            LoginError::Store(err) => format!("Could not save the session: {err}"),
        }
    }
}

pub struct SessionContext {
    store: KeyValueStore,
    session: Option<Session>,
}

impl SessionContext {
    pub fn load(store: KeyValueStore) -> Self {
        let session = Self::read_session(&store);
        Self { store, session }
    }

    fn read_session(store: &KeyValueStore) -> Option<Session> {
        let token = store.get(keys::TOKEN).filter(|t| !t.is_empty())?;
        let role = store.get(keys::ROLE).and_then(UserRole::from_str)?;
        Some(Session {
            token: token.to_string(),
            role,
            founder_name: store.get(keys::FOUNDER).map(str::to_string),
            startup_name: store.get(keys::STARTUP).map(str::to_string),
        })
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The session, if it carries exactly `role`.
    pub fn require(&self, role: UserRole) -> Option<&Session> {
        self.session.as_ref().filter(|s| s.role == role)
    }

    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.token.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn store(&self) -> &KeyValueStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut KeyValueStore {
        &mut self.store
    }

    /// Persists a successful login.
    pub fn establish(
        &mut self,
        reply: &LoginReply,
        founder_name: Option<&str>,
        startup_name: Option<&str>,
    ) -> Result<Session, LoginError> {
        let role = UserRole::from_str(&reply.role)
            .ok_or_else(|| LoginError::Invalid(format!("Unexpected role '{}' in login reply.", reply.role)))?;
        if reply.access_token.is_empty() {
            return Err(LoginError::Invalid("Login reply carried no token.".to_string()));
        }

        // A new login never inherits names from a previous one
        self.store.remove_all(&[keys::FOUNDER, keys::STARTUP])?;
        self.store.set(keys::TOKEN, reply.access_token.as_str())?;
        self.store.set(keys::ROLE, role.as_str())?;
        if let Some(name) = founder_name {
            self.store.set(keys::FOUNDER, name)?;
        }
        if let Some(name) = startup_name {
            self.store.set(keys::STARTUP, name)?;
        }

        let session = Session {
            token: reply.access_token.clone(),
            role,
            founder_name: founder_name.map(str::to_string),
            startup_name: startup_name.map(str::to_string),
        };
        tracing::info!(role = role.as_str(), "session established");
        self.session = Some(session.clone());
        Ok(session)
    }

    /// Clears every stored credential. Called on logout and on any 401/403.
    pub fn teardown(&mut self) -> Result<(), CoreError> {
        if let Some(session) = &self.session {
            tracing::info!(role = session.role.as_str(), "tearing down session");
        }
        self.session = None;
        self.store
            .remove_all(&[keys::TOKEN, keys::ROLE, keys::STARTUP, keys::FOUNDER])
    }

    /// An API client carrying this session's token.
    pub fn client(&self, base: &ApiClient) -> ApiClient {
        let mut client = base.clone();
        client.set_token(self.token().map(str::to_string));
        client
    }
}

pub async fn login_founder(
    client: &ApiClient,
    ctx: &mut SessionContext,
    startup_name: &str,
    founder_name: &str,
) -> Result<Session, LoginError> {
    let startup_name = startup_name.trim();
    let founder_name = founder_name.trim();
    if startup_name.is_empty() || founder_name.is_empty() {
        return Err(LoginError::Invalid(
            "Startup name and founder name are required.".to_string(),
        ));
    }

    let reply = client.founder_login(startup_name, founder_name).await?;
    ctx.establish(&reply, Some(founder_name), Some(startup_name))
}

pub async fn login_admin(
    client: &ApiClient,
    ctx: &mut SessionContext,
    username: &str,
    password: &str,
) -> Result<Session, LoginError> {
    if username.trim().is_empty() || password.is_empty() {
        return Err(LoginError::Invalid("Username and password are required.".to_string()));
    }

    let reply = client.admin_login(username.trim(), password).await?;
    ctx.establish(&reply, None, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(role: &str) -> LoginReply {
        LoginReply {
            access_token: "jwt".into(),
            token_type: "bearer".into(),
            role: role.into(),
            message: String::new(),
        }
    }

    #[test]
    fn role_strings_match_exactly() {
        assert_eq!(UserRole::from_str("founder"), Some(UserRole::Founder));
        assert_eq!(UserRole::from_str("admin"), Some(UserRole::Admin));
        assert_eq!(UserRole::from_str("Admin"), None);
        assert_eq!(UserRole::from_str(" founder"), None);
    }

    #[test]
    fn session_requires_token_and_known_role() {
        let mut store = KeyValueStore::in_memory();
        store.set(keys::ROLE, "founder").unwrap();
        assert!(!SessionContext::load(store.clone()).is_authenticated());

        store.set(keys::TOKEN, "").unwrap();
        assert!(!SessionContext::load(store.clone()).is_authenticated());

        store.set(keys::TOKEN, "abc").unwrap();
        store.set(keys::ROLE, "superuser").unwrap();
        assert!(!SessionContext::load(store.clone()).is_authenticated());

        store.set(keys::ROLE, "founder").unwrap();
        let ctx = SessionContext::load(store);
        assert!(ctx.require(UserRole::Founder).is_some());
        assert!(ctx.require(UserRole::Admin).is_none());
    }

    #[test]
    fn establish_then_teardown() {
        let mut ctx = SessionContext::load(KeyValueStore::in_memory());
        ctx.store_mut().set(keys::AGENT_CONFIG, "{}").unwrap();

        let session = ctx
            .establish(&reply("founder"), Some("Ana"), Some("Acme"))
            .unwrap();
        assert_eq!(session.role, UserRole::Founder);
        assert_eq!(ctx.store().get(keys::STARTUP), Some("Acme"));
        assert_eq!(ctx.token(), Some("jwt"));

        ctx.teardown().unwrap();
        assert!(!ctx.is_authenticated());
        for key in [keys::TOKEN, keys::ROLE, keys::STARTUP, keys::FOUNDER] {
            assert_eq!(ctx.store().get(key), None, "{key} survived teardown");
        }
        // chat preferences are not credentials
        assert_eq!(ctx.store().get(keys::AGENT_CONFIG), Some("{}"));
    }

    #[test]
    fn unknown_role_in_reply_is_rejected() {
        let mut ctx = SessionContext::load(KeyValueStore::in_memory());
        let err = ctx.establish(&reply("guest"), None, None).unwrap_err();
        assert!(matches!(err, LoginError::Invalid(_)));
        assert!(!ctx.is_authenticated());
    }

    #[tokio::test]
    async fn founder_login_validates_locally() {
        // Nothing listens here; validation must fail before any request
        let client = ApiClient::new("http://127.0.0.1:9");
        let mut ctx = SessionContext::load(KeyValueStore::in_memory());
        let err = login_founder(&client, &mut ctx, "  ", "Ana").await.unwrap_err();
        assert_eq!(err.user_message(), "Startup name and founder name are required.");
    }

    #[test]
    fn login_auth_error_reads_as_invalid_credentials() {
        let err = LoginError::Api(ApiError::Auth(401));
        assert_eq!(err.user_message(), status::INVALID_CREDENTIALS);
    }
}
