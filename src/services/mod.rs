pub mod duel_platform;
pub mod oracle;
pub mod result_feed;

pub use duel_platform::DuelPlatformService;
pub use oracle::OracleService;
pub use result_feed::{ResultFeedClient, ResultSource};
