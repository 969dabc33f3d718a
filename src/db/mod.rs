use deadpool_postgres::{Manager, Pool};
use tokio_postgres::Config as PgConfig;

use crate::Config;

pub mod feedback;
pub mod export;

pub use feedback::{Category, Feedback, Status};

/// Builds the connection pool. No connection is opened until first use.
pub fn create_pool(config: &Config) -> anyhow::Result<Pool> {
    let mut cfg = PgConfig::new();
    cfg.host(&config.db_host);
    cfg.user(&config.db_user);
    cfg.password(&config.db_password);
    cfg.dbname(&config.db_name);

    let mgr = Manager::new(cfg, tokio_postgres::NoTls);
    let pool = Pool::builder(mgr).max_size(16).build()?;
    Ok(pool)
}
