use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::{
    configuration::State,
    error::Error,
    model::{Subscription, Table},
    push::PushDelivery,
    types::PushMessage,
};

/// Bookkeeping applied after each delivery attempt.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn mark_used(&self, id: i64) -> Result<(), Error>;
    async fn mark_gone(&self, id: i64) -> Result<(), Error>;
}

#[async_trait]
impl SubscriptionStore for Table<Subscription> {
    async fn mark_used(&self, id: i64) -> Result<(), Error> {
        self.touch(id).await?;
        Ok(())
    }

    async fn mark_gone(&self, id: i64) -> Result<(), Error> {
        self.deactivate(id).await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResult {
    #[serde(skip)]
    pub id: i64,
    pub endpoint: String,
    pub device_id: Option<String>,
    pub device_name: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deactivated: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct PushReport {
    pub results: Vec<PushResult>,
    pub summary: Summary,
}

impl PushReport {
    fn new(results: Vec<PushResult>) -> Self {
        let success = results.iter().filter(|r| r.success).count();
        let summary = Summary {
            total: results.len(),
            success,
            failed: results.len() - success,
        };

        PushReport { results, summary }
    }
}

#[derive(Clone, Copy)]
pub struct Dispatcher<'a> {
    pub delivery: &'a dyn PushDelivery,
    pub store: &'a dyn SubscriptionStore,
    pub permits: &'a Semaphore,
    pub gone_status: &'a [u16],
}

impl<'a> Dispatcher<'a> {
    pub fn from_state(state: &'a State) -> Self {
        Dispatcher {
            delivery: state.push.as_ref(),
            store: &state.database.subscription,
            permits: state.push_permits.as_ref(),
            gone_status: &state.config.status_code_to_delete,
        }
    }
}

/// Delivers `message` to every subscription concurrently and waits for all
/// attempts. A failed attempt never affects the others.
pub async fn send(
    dispatcher: Dispatcher<'_>,
    subscriptions: Vec<Subscription>,
    message: &PushMessage,
) -> Result<PushReport, Error> {
    let payload = message.to_payload()?;
    let tasks = subscriptions
        .into_iter()
        .map(|subscription| send_one(dispatcher, subscription, &payload));

    let report = PushReport::new(join_all(tasks).await);
    info!(
        "Push fanout finished: {} sent, {} failed",
        report.summary.success, report.summary.failed
    );

    Ok(report)
}

async fn send_one(
    dispatcher: Dispatcher<'_>,
    subscription: Subscription,
    payload: &[u8],
) -> PushResult {
    let mut result = PushResult {
        id: subscription.id,
        endpoint: subscription.endpoint.to_owned(),
        device_id: subscription.device_id.to_owned(),
        device_name: subscription.device_name.to_owned(),
        success: false,
        error: None,
        deactivated: false,
    };

    let _permit = match dispatcher.permits.acquire().await {
        Ok(permit) => permit,
        Err(e) => {
            error!("Push notification semaphore closed");
            result.error = Some(e.to_string());
            return result;
        },
    };

    match dispatcher
        .delivery
        .deliver(&subscription.target(), payload)
        .await
    {
        Ok(()) => {
            result.success = true;
            if let Err(e) = dispatcher.store.mark_used(subscription.id).await {
                error!(
                    "Could not update last_used of subscription {}: {}",
                    subscription.id, e
                );
            }
        },
        Err(e) => {
            warn!(
                "Failed to send to {}: {}",
                subscription
                    .device_name
                    .as_deref()
                    .unwrap_or(&subscription.endpoint),
                e
            );

            let gone = e
                .push_status()
                .is_some_and(|status| dispatcher.gone_status.contains(&status));

            if gone {
                match dispatcher.store.mark_gone(subscription.id).await {
                    Ok(()) => {
                        result.deactivated = true;
                        info!("Deactivated subscription {}", subscription.id);
                    },
                    Err(e) => error!(
                        "Could not deactivate subscription {}: {}",
                        subscription.id, e
                    ),
                }
            }

            result.error = Some(e.to_string());
        },
    }

    result
}
