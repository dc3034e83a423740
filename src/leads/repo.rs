use std::sync::Arc;

use crate::leads::repo_types::EmailLead;
use crate::store::{from_document, to_document, DocumentStore, Filter, StoreError};

const LEADS: &str = "email_leads";

#[derive(Clone)]
pub struct LeadStore {
    store: Arc<dyn DocumentStore>,
}

impl LeadStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<EmailLead>, StoreError> {
        self.store
            .find_one(LEADS, &Filter::eq("email", email))
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn create(&self, lead: &EmailLead) -> Result<(), StoreError> {
        self.store.insert_one(LEADS, to_document(lead)?).await
    }
}
