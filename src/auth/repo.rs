use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::auth::repo_types::{Session, User};
use crate::store::{from_document, to_document, Document, DocumentStore, Filter, StoreError};

const USERS: &str = "users";
const SESSIONS: &str = "user_sessions";

#[derive(Clone)]
pub struct UserStore {
    store: Arc<dyn DocumentStore>,
}

impl UserStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Find a user by email (exact match).
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.store
            .find_one(USERS, &Filter::eq("email", email))
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn find_by_id(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        self.store
            .find_one(USERS, &Filter::eq("user_id", user_id))
            .await?
            .map(from_document)
            .transpose()
    }

    /// Fails with [`StoreError::Duplicate`] when the email or id is taken.
    pub async fn create(&self, user: &User) -> Result<(), StoreError> {
        self.store.insert_one(USERS, to_document(user)?).await
    }

    /// Overwrites the provider-owned profile fields. Returns whether the user exists.
    pub async fn update_profile(
        &self,
        user_id: &str,
        name: &str,
        picture: Option<&str>,
    ) -> Result<bool, StoreError> {
        let mut set = Document::new();
        set.insert("name".into(), Value::from(name));
        set.insert(
            "picture".into(),
            picture.map(Value::from).unwrap_or(Value::Null),
        );
        let matched = self
            .store
            .update_one(USERS, &Filter::eq("user_id", user_id), set)
            .await?;
        Ok(matched > 0)
    }
}

#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn DocumentStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn find_by_token(&self, token: &str) -> Result<Option<Session>, StoreError> {
        self.store
            .find_one(SESSIONS, &Filter::eq("session_token", token))
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn create(&self, session: &Session) -> Result<(), StoreError> {
        self.store.insert_one(SESSIONS, to_document(session)?).await
    }

    /// Inserts `session`, overwriting any stored session with the same token in place.
    pub async fn replace(&self, session: &Session) -> Result<(), StoreError> {
        match self.create(session).await {
            Err(StoreError::Duplicate { .. }) => {
                let by_token = Filter::eq("session_token", session.session_token.as_str());
                if let Some(previous) = self.find_by_token(&session.session_token).await? {
                    if previous.user_id != session.user_id {
                        warn!(
                            from = %previous.user_id,
                            to = %session.user_id,
                            "session token reassigned to another user"
                        );
                    }
                }
                let matched = self
                    .store
                    .update_one(SESSIONS, &by_token, to_document(session)?)
                    .await?;
                if matched == 0 {
                    // Deleted between the failed insert and the update.
                    return self.create(session).await;
                }
                Ok(())
            }
            other => other,
        }
    }

    pub async fn delete_for_user(&self, user_id: &str) -> Result<u64, StoreError> {
        self.store
            .delete_many(SESSIONS, &Filter::eq("user_id", user_id))
            .await
    }
}
