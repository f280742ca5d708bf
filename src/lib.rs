pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod email;

pub use db::DbPool;

use config::Config;
use email::Mailer;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub mailer: Mailer,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        let mailer = Mailer::new(config.email.clone());
        Self { config, db, mailer }
    }
}
