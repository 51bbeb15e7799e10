use crate::{
    configuration::Config,
    dao::{PoolOption, PoolType},
    error::Error,
    model::{Subscription, Table},
};

#[derive(Debug)]
pub struct DatabasePool {
    pub subscription: Table<Subscription>,
    pub pool: PoolType,
}

impl DatabasePool {
    pub async fn new(config: &Config) -> Result<DatabasePool, Error> {
        let pool = PoolOption::new()
            .max_connections(config.max_connections)
            .connect(config.database_url.as_str())
            .await?;

        Ok(Self::from_pool(pool))
    }

    /// Pool that connects on first use.
    pub fn new_lazy(config: &Config) -> Result<DatabasePool, Error> {
        let pool = PoolOption::new()
            .max_connections(config.max_connections)
            .connect_lazy(config.database_url.as_str())?;

        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PoolType) -> DatabasePool {
        DatabasePool {
            subscription: Table::new(pool.clone()),
            pool,
        }
    }

    pub fn get_pool(&self) -> &PoolType {
        &self.pool
    }
}
