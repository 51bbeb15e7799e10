//! In-memory stand-ins for the push service and the subscription table.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    error::Error,
    configuration::State,
    dao::PoolType,
    handler::send_push::SubscriptionStore,
    model::{NewSubscription, Subscription},
    provider::DatabasePool,
    push::PushDelivery,
    types::PushTarget,
};

pub fn subscription(
    id: i64,
    device_id: Option<&str>,
    user_id: Option<&str>,
) -> Subscription {
    let created = Utc::now() - chrono::Duration::hours(1);
    Subscription {
        id,
        endpoint: format!("https://push.example.com/{}", id),
        keys_p256dh: String::from("p256dh"),
        keys_auth: String::from("auth"),
        device_id: device_id.map(str::to_owned),
        device_name: device_id.map(|d| format!("Device {}", d)),
        user_agent: None,
        platform: None,
        user_id: user_id.map(str::to_owned),
        is_active: true,
        last_used: created + chrono::Duration::seconds(id),
        created_at: created,
    }
}

/// Upsert input with keys derived from `endpoint` and `generation`.
pub fn new_subscription(
    endpoint: &str,
    generation: u32,
    device_id: Option<&str>,
    user_id: Option<&str>,
) -> NewSubscription {
    NewSubscription {
        endpoint: endpoint.to_owned(),
        keys_p256dh: format!("p256dh-{}", generation),
        keys_auth: format!("auth-{}", generation),
        device_id: device_id.map(str::to_owned),
        device_name: device_id.map(|d| format!("Device {}", d)),
        user_agent: None,
        platform: Some(String::from("Linux")),
        user_id: user_id.map(str::to_owned),
    }
}

/// Pool with the `push_subscription` schema applied.
pub async fn database(pool: PoolType) -> DatabasePool {
    let database = DatabasePool::from_pool(pool);
    State::init_migrations(&database).await.unwrap();
    database
}

/// Records every attempt; endpoints listed in `statuses` are rejected with
/// that status.
#[derive(Debug, Default)]
pub struct FakeDelivery {
    statuses: HashMap<String, u16>,
    delay_ms: u64,
    attempts: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    payloads: Mutex<Vec<Vec<u8>>>,
}

impl FakeDelivery {
    pub fn with_status(mut self, endpoint: &str, status: u16) -> Self {
        self.statuses.insert(endpoint.to_owned(), status);
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushDelivery for FakeDelivery {
    async fn deliver(
        &self,
        target: &PushTarget,
        payload: &[u8],
    ) -> Result<(), Error> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.payloads.lock().unwrap().push(payload.to_vec());

        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.statuses.get(&target.endpoint) {
            Some(status) => Err(Error::PushRejected { status: *status }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Subscription>>,
}

impl MemoryStore {
    pub fn new(rows: Vec<Subscription>) -> Self {
        MemoryStore {
            rows: Mutex::new(rows),
        }
    }

    pub fn active(&self) -> Vec<Subscription> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.is_active)
            .cloned()
            .collect()
    }

    pub fn get(&self, id: i64) -> Subscription {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.id == id)
            .cloned()
            .unwrap()
    }

    fn update(&self, id: i64, f: impl FnOnce(&mut Subscription)) {
        if let Some(row) =
            self.rows.lock().unwrap().iter_mut().find(|row| row.id == id)
        {
            f(row);
        }
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn mark_used(&self, id: i64) -> Result<(), Error> {
        self.update(id, |row| row.last_used = Utc::now());
        Ok(())
    }

    async fn mark_gone(&self, id: i64) -> Result<(), Error> {
        self.update(id, |row| row.is_active = false);
        Ok(())
    }
}
