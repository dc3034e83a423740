use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Lead document in the `email_leads` collection. Never mutated after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailLead {
    pub lead_id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(with = "crate::timestamp")]
    pub created_at: OffsetDateTime,
}
