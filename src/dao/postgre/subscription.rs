use super::QueryResult;
use crate::model::{Device, NewSubscription, Subscription, Table};
use sqlx::error::Error;

impl Table<Subscription> {
    /// Inserts or refreshes the row keyed by `endpoint`; a refreshed row is
    /// active again.
    pub async fn upsert(
        &self,
        subscription: &NewSubscription,
    ) -> Result<Subscription, Error> {
        sqlx::query_as(
            r#"
            INSERT INTO push_subscription (
                endpoint, keys_p256dh, keys_auth, device_id, device_name,
                user_agent, platform, user_id
            )
            VALUES($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (endpoint) DO UPDATE SET
                keys_p256dh = EXCLUDED.keys_p256dh,
                keys_auth = EXCLUDED.keys_auth,
                device_id = COALESCE(EXCLUDED.device_id, push_subscription.device_id),
                device_name = COALESCE(EXCLUDED.device_name, push_subscription.device_name),
                user_agent = COALESCE(EXCLUDED.user_agent, push_subscription.user_agent),
                platform = COALESCE(EXCLUDED.platform, push_subscription.platform),
                user_id = COALESCE(EXCLUDED.user_id, push_subscription.user_id),
                is_active = true,
                last_used = now()
            RETURNING *
            "#,
        )
        .bind(&subscription.endpoint)
        .bind(&subscription.keys_p256dh)
        .bind(&subscription.keys_auth)
        .bind(&subscription.device_id)
        .bind(&subscription.device_name)
        .bind(&subscription.user_agent)
        .bind(&subscription.platform)
        .bind(&subscription.user_id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get_all(&self) -> Result<Vec<Subscription>, Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM push_subscription ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get_active(&self) -> Result<Vec<Subscription>, Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM push_subscription WHERE is_active = true ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get_active_by_device_ids(
        &self,
        device_ids: &[String],
    ) -> Result<Vec<Subscription>, Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM push_subscription
            WHERE is_active = true AND device_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(device_ids)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get_active_by_user_ids(
        &self,
        user_ids: &[String],
    ) -> Result<Vec<Subscription>, Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM push_subscription
            WHERE is_active = true AND user_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await
    }

    /// Active rows carrying a device id, newest `last_used` first.
    pub async fn get_devices(
        &self,
        user_id: Option<String>,
    ) -> Result<Vec<Device>, Error> {
        sqlx::query_as(
            r#"
            SELECT
                id, device_id, device_name, platform, user_agent, user_id,
                last_used, created_at
            FROM push_subscription
            WHERE
                is_active = true
            AND
                device_id IS NOT NULL
            AND
                ($1::TEXT IS NULL OR user_id = $1)
            ORDER BY last_used DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn delete_by_device_id(
        &self,
        device_id: String,
    ) -> Result<QueryResult, Error> {
        sqlx::query(
            r#"
            DELETE FROM push_subscription WHERE device_id = $1
            "#,
        )
        .bind(device_id)
        .execute(&self.pool)
        .await
    }

    pub async fn delete_by_endpoint(
        &self,
        endpoint: String,
    ) -> Result<QueryResult, Error> {
        sqlx::query(
            r#"
            DELETE FROM push_subscription WHERE endpoint = $1
            "#,
        )
        .bind(endpoint)
        .execute(&self.pool)
        .await
    }

    pub async fn touch(&self, id: i64) -> Result<QueryResult, Error> {
        sqlx::query(
            r#"
            UPDATE push_subscription SET last_used = now() WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
    }

    pub async fn deactivate(&self, id: i64) -> Result<QueryResult, Error> {
        sqlx::query(
            r#"
            UPDATE push_subscription SET is_active = false WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
    }
}
