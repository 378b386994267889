use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Pastie;

/// A pastie as shown to API clients.
#[derive(Debug, Serialize)]
pub struct PublicPastie {
    pub id: i64,
    pub url: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PublicPastie {
    /// Strip storage details from a pastie and attach its canonical URL.
    pub fn new(pastie: Pastie, base_url: &str) -> Self {
        PublicPastie {
            url: pastie_url(base_url, pastie.id),
            id: pastie.id,
            content: pastie.content,
            created_at: pastie.created_at,
            updated_at: pastie.updated_at,
        }
    }
}

pub fn pastie_url(base_url: &str, id: i64) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/pastie/{id}")
}

#[derive(Serialize)]
pub struct PastieResponse {
    pub pastie: PublicPastie,
}

#[derive(Serialize)]
pub struct PastieListResponse {
    pub pasties: Vec<PublicPastie>,
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

/// Request body for creating or updating a pastie.
#[derive(Debug, Deserialize)]
pub struct EditPastie {
    pub content: String,
}
