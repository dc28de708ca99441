pub mod health;
pub mod matches;
pub mod oracle;
pub mod stats;
pub mod users;

use std::sync::Arc;

use crate::{
    config::Config,
    services::{DuelPlatformService, OracleService},
};

#[derive(Clone)]
pub struct AppState {
    pub duel: Arc<DuelPlatformService>,
    pub oracle: Arc<OracleService>,
    pub config: Config,
}
