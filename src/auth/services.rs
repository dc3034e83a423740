use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::{
    dto::{Credentials, PublicUser},
    password::{hash_password, verify_password},
    provider::{IdentityProvider, ProviderError},
    repo::{SessionStore, UserStore},
    repo_types::{Session, User},
};
use crate::store::{DocumentStore, StoreError};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Email already registered")]
    DuplicateEmail,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Invalid session ID")]
    InvalidSessionId,
    #[error("Identity provider unavailable")]
    Upstream(#[source] ProviderError),
    #[error("Not authenticated")]
    Unauthenticated,
    #[error("Invalid session")]
    InvalidSession,
    #[error("Session expired")]
    SessionExpired,
    #[error("User not found")]
    UserNotFound,
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

fn new_user_id() -> String {
    format!("user_{}", &Uuid::new_v4().simple().to_string()[..12])
}

fn new_session_token() -> String {
    format!("session_{}", Uuid::new_v4().simple())
}

/// Signup, login, third-party exchange, logout and current-user resolution.
#[derive(Clone)]
pub struct AuthService {
    users: UserStore,
    sessions: SessionStore,
    identity: Arc<dyn IdentityProvider>,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            users: UserStore::new(store.clone()),
            sessions: SessionStore::new(store),
            identity,
            session_ttl,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    fn session_for(&self, user_id: &str, token: String) -> Session {
        let now = OffsetDateTime::now_utc();
        Session {
            user_id: user_id.to_string(),
            session_token: token,
            expires_at: now + self.session_ttl,
            created_at: now,
        }
    }

    async fn issue_session(&self, user_id: &str) -> Result<String, AuthError> {
        let session = self.session_for(user_id, new_session_token());
        self.sessions.create(&session).await?;
        debug!(%user_id, "session issued");
        Ok(session.session_token)
    }

    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<(PublicUser, String), AuthError> {
        if self.users.find_by_email(email).await?.is_some() {
            warn!(%email, "email already registered");
            return Err(AuthError::DuplicateEmail);
        }

        let plain = password.to_string();
        let hash = tokio::task::spawn_blocking(move || hash_password(&plain))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .map_err(|e| AuthError::Hashing(e.to_string()))?;

        let user = User {
            user_id: new_user_id(),
            email: email.to_string(),
            name: name.to_string(),
            password_hash: Some(hash),
            picture: None,
            is_premium: false,
            created_at: OffsetDateTime::now_utc(),
        };

        // The unique index settles concurrent signups that both passed the check above.
        match self.users.create(&user).await {
            Ok(()) => {}
            Err(StoreError::Duplicate { .. }) => {
                warn!(%email, "email registered concurrently");
                return Err(AuthError::DuplicateEmail);
            }
            Err(e) => return Err(e.into()),
        }

        // No rollback: if this fails the user stays registered without a session.
        let token = self.issue_session(&user.user_id).await.map_err(|e| {
            error!(error = %e, user_id = %user.user_id, "session insert failed after signup");
            e
        })?;

        info!(user_id = %user.user_id, %email, "user registered");
        Ok((user.into(), token))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(PublicUser, String), AuthError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            warn!(%email, "login unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        let plain = password.to_string();
        let stored = user.password_hash.clone().unwrap_or_default();
        let ok = tokio::task::spawn_blocking(move || verify_password(&plain, &stored))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?;
        if !ok {
            warn!(%email, user_id = %user.user_id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.issue_session(&user.user_id).await?;
        info!(user_id = %user.user_id, %email, "user logged in");
        Ok((user.into(), token))
    }

    /// Trades a provider session id for a local user and adopts the provider's token.
    pub async fn exchange_session(&self, session_id: &str) -> Result<(PublicUser, String), AuthError> {
        let identity = match self.identity.session_data(session_id).await {
            Ok(identity) => identity,
            Err(ProviderError::Rejected(status)) => {
                warn!(%status, "session exchange rejected");
                return Err(AuthError::InvalidSessionId);
            }
            Err(e) => {
                error!(error = %e, "identity provider call failed");
                return Err(AuthError::Upstream(e));
            }
        };

        let user = self
            .upsert_provider_user(&identity.email, &identity.name, identity.picture.as_deref())
            .await?;

        let session = self.session_for(&user.user_id, identity.session_token);
        self.sessions.replace(&session).await?;

        info!(user_id = %user.user_id, email = %user.email, "third-party session exchanged");
        Ok((user.into(), session.session_token))
    }

    async fn upsert_provider_user(
        &self,
        email: &str,
        name: &str,
        picture: Option<&str>,
    ) -> Result<User, AuthError> {
        if let Some(existing) = self.users.find_by_email(email).await? {
            return self.refresh_profile(existing, name, picture).await;
        }

        let user = User {
            user_id: new_user_id(),
            email: email.to_string(),
            name: name.to_string(),
            password_hash: None,
            picture: picture.map(str::to_string),
            is_premium: false,
            created_at: OffsetDateTime::now_utc(),
        };
        match self.users.create(&user).await {
            Ok(()) => {
                info!(user_id = %user.user_id, %email, "user created from identity provider");
                Ok(user)
            }
            Err(StoreError::Duplicate { .. }) => {
                let existing = self
                    .users
                    .find_by_email(email)
                    .await?
                    .ok_or(AuthError::UserNotFound)?;
                self.refresh_profile(existing, name, picture).await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn refresh_profile(
        &self,
        mut user: User,
        name: &str,
        picture: Option<&str>,
    ) -> Result<User, AuthError> {
        self.users.update_profile(&user.user_id, name, picture).await?;
        user.name = name.to_string();
        user.picture = picture.map(str::to_string);
        Ok(user)
    }

    pub async fn resolve_current_user(&self, creds: &Credentials) -> Result<PublicUser, AuthError> {
        let token = creds.token().ok_or(AuthError::Unauthenticated)?;

        let session = self
            .sessions
            .find_by_token(token)
            .await?
            .ok_or(AuthError::InvalidSession)?;

        if !session.is_active_at(OffsetDateTime::now_utc()) {
            debug!(user_id = %session.user_id, "session expired");
            return Err(AuthError::SessionExpired);
        }

        let user = self
            .users
            .find_by_id(&session.user_id)
            .await?
            .ok_or_else(|| {
                error!(user_id = %session.user_id, "session references missing user");
                AuthError::UserNotFound
            })?;
        Ok(user.into())
    }

    /// Deletes every session of `user_id`. Succeeds when there were none.
    pub async fn logout(&self, user_id: &str) -> Result<u64, AuthError> {
        let removed = self.sessions.delete_for_user(user_id).await?;
        info!(%user_id, removed, "user logged out");
        Ok(removed)
    }
}
