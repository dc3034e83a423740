use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::leads::{repo::LeadStore, repo_types::EmailLead};
use crate::store::{DocumentStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum LeadError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct LeadService {
    leads: LeadStore,
}

impl LeadService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            leads: LeadStore::new(store),
        }
    }

    /// Returns the existing lead for `email`, or records a new one.
    pub async fn capture(&self, email: &str, name: Option<&str>) -> Result<EmailLead, LeadError> {
        if let Some(existing) = self.leads.find_by_email(email).await? {
            debug!(lead_id = %existing.lead_id, "lead already captured");
            return Ok(existing);
        }

        let lead = EmailLead {
            lead_id: format!("lead_{}", &Uuid::new_v4().simple().to_string()[..12]),
            email: email.to_string(),
            name: name.map(str::to_string),
            created_at: OffsetDateTime::now_utc(),
        };
        match self.leads.create(&lead).await {
            Ok(()) => {
                info!(lead_id = %lead.lead_id, "lead captured");
                Ok(lead)
            }
            Err(StoreError::Duplicate { .. }) => {
                // Lost a race with a concurrent capture of the same email.
                match self.leads.find_by_email(email).await? {
                    Some(winner) => Ok(winner),
                    None => Err(StoreError::Duplicate {
                        collection: "email_leads".into(),
                        field: "email".into(),
                    }
                    .into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}
