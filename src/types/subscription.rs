use serde::Deserialize;

use crate::{error::Error, model::NewSubscription};

use super::PushMessage;

#[derive(Debug, Deserialize)]
pub struct Subscription {
    pub endpoint: Option<String>,
    pub keys: Option<Keys>,
    #[serde(alias = "deviceId")]
    pub device_id: Option<String>,
    #[serde(alias = "deviceName")]
    pub device_name: Option<String>,
    #[serde(alias = "userAgent")]
    pub user_agent: Option<String>,
    pub platform: Option<String>,
    #[serde(alias = "userId")]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Keys {
    pub p256dh: Option<String>,
    pub auth: Option<String>,
}

impl Subscription {
    /// Validates endpoint and keys; `fallback_user_agent` fills a missing
    /// `user_agent` (usually the request header).
    pub fn into_new(
        self,
        fallback_user_agent: Option<String>,
    ) -> Result<NewSubscription, Error> {
        let endpoint = required(self.endpoint, "endpoint")?;
        let keys = self
            .keys
            .ok_or_else(|| Error::MissingParams(String::from("keys")))?;
        let p256dh = required(keys.p256dh, "keys.p256dh")?;
        let auth = required(keys.auth, "keys.auth")?;

        Ok(NewSubscription {
            endpoint,
            keys_p256dh: p256dh,
            keys_auth: auth,
            device_id: non_blank(self.device_id),
            device_name: non_blank(self.device_name),
            user_agent: non_blank(self.user_agent).or(fallback_user_agent),
            platform: non_blank(self.platform),
            user_id: non_blank(self.user_id),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct Unsubscribe {
    pub endpoint: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Notify {
    pub title: Option<String>,
    pub body: Option<String>,
}

impl Notify {
    pub fn message(&self) -> Result<PushMessage, Error> {
        message(&self.title, &self.body)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyTargeted {
    pub title: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub send_to_all: bool,
    pub device_ids: Option<Vec<String>>,
    pub user_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyTarget {
    All,
    Devices(Vec<String>),
    Users(Vec<String>),
}

impl NotifyTargeted {
    pub fn message(&self) -> Result<PushMessage, Error> {
        message(&self.title, &self.body)
    }

    /// `sendToAll` wins, then a non-empty `deviceIds`, then a non-empty
    /// `userIds`.
    pub fn target(&self) -> Result<NotifyTarget, Error> {
        if self.send_to_all {
            return Ok(NotifyTarget::All);
        }

        match (&self.device_ids, &self.user_ids) {
            (Some(ids), _) if !ids.is_empty() => {
                Ok(NotifyTarget::Devices(ids.to_owned()))
            },
            (_, Some(ids)) if !ids.is_empty() => {
                Ok(NotifyTarget::Users(ids.to_owned()))
            },
            _ => Err(Error::MissingParams(String::from(
                "Must specify deviceIds, userIds, or sendToAll",
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DevicesQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

fn message(
    title: &Option<String>,
    body: &Option<String>,
) -> Result<PushMessage, Error> {
    match (non_blank(title.clone()), non_blank(body.clone())) {
        (Some(title), Some(body)) => Ok(PushMessage { title, body }),
        _ => Err(Error::MissingParams(String::from(
            "Title and body required",
        ))),
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, Error> {
    non_blank(value).ok_or_else(|| Error::MissingParams(field.to_owned()))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
