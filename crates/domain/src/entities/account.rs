use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, AccountUserId};

/// Billing and ownership boundary. Players subscribe to games as accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: AccountId::new(),
            name: name.into(),
            created_at: now,
        }
    }
}

/// A login belonging to exactly one account. Email is unique across users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountUser {
    pub id: AccountUserId,
    pub account_id: AccountId,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl AccountUser {
    pub fn new(
        account_id: AccountId,
        email: impl Into<String>,
        name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AccountUserId::new(),
            account_id,
            email: email.into().trim().to_lowercase(),
            name: name.into(),
            created_at: now,
        }
    }
}
