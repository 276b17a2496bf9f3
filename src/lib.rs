pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::database::Database;
use crate::utils::time::{Clock, SystemClock};

#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub config: Arc<Config>,
    pub clock: Arc<dyn Clock>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(database: Database, config: Config) -> Self {
        Self {
            database,
            config: Arc::new(config),
            clock: Arc::new(SystemClock),
            started_at: Instant::now(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}
