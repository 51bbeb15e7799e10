//! Database models
//!
//! Subscription rows and the device projection served by `/devices`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::types::PushTarget;

// =============================================================================
// SUBSCRIPTION
// =============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct Subscription {
    pub id: i64,
    pub endpoint: String,
    pub keys_p256dh: String,
    pub keys_auth: String,
    pub device_id: Option<String>,
    pub device_name: Option<String>,
    pub user_agent: Option<String>,
    pub platform: Option<String>,
    pub user_id: Option<String>,
    pub is_active: bool,
    pub last_used: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    pub fn target(&self) -> PushTarget {
        PushTarget {
            endpoint: self.endpoint.to_owned(),
            p256dh: self.keys_p256dh.to_owned(),
            auth: self.keys_auth.to_owned(),
        }
    }
}

/// Values written by an upsert; the id and timestamps come from the store.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub endpoint: String,
    pub keys_p256dh: String,
    pub keys_auth: String,
    pub device_id: Option<String>,
    pub device_name: Option<String>,
    pub user_agent: Option<String>,
    pub platform: Option<String>,
    pub user_id: Option<String>,
}

// =============================================================================
// DEVICE
// =============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: i64,
    pub device_id: String,
    pub device_name: Option<String>,
    pub platform: Option<String>,
    pub user_agent: Option<String>,
    pub user_id: Option<String>,
    pub last_used: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
