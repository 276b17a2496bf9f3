pub mod memory;
pub mod pool;
pub mod seed;
pub mod session;

use sqlx::PgPool;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use memory::MemoryDatabase;
pub use session::Session;

/// Storage backend shared by every request.
#[derive(Clone)]
pub enum Database {
    Postgres(PgPool),
    Memory(MemoryDatabase),
}

impl Database {
    /// Connects to Postgres and applies migrations when `DATABASE_URL` is
    /// set, otherwise starts an empty in-memory store.
    pub async fn connect(config: &Config) -> Result<Self> {
        match config.database_url.as_deref() {
            Some(url) => {
                let pool = pool::create_pool(config, url).await?;
                sqlx::migrate!("./migrations").run(&pool).await?;
                info!("Connected to Postgres, migrations applied");
                Ok(Database::Postgres(pool))
            }
            None => {
                info!("DATABASE_URL not set, using the in-memory store");
                Ok(Database::Memory(MemoryDatabase::new()))
            }
        }
    }

    pub fn memory() -> Self {
        Database::Memory(MemoryDatabase::new())
    }

    pub fn session(&self) -> Session {
        Session::new(self)
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Database::Postgres(_) => "postgres",
            Database::Memory(_) => "memory",
        }
    }
}
