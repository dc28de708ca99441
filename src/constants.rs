/// Application constants

// Vacant participant slots and unset winners read back as the zero address
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

// Match status codes as stored on-chain
pub const STATUS_WAITING: u8 = 0;
pub const STATUS_IN_PROGRESS: u8 = 1;
pub const STATUS_COMPLETED: u8 = 2;
pub const STATUS_CANCELLED: u8 = 3;

// Match modes
pub const MODE_REFEREE: u8 = 0;
pub const MODE_ORACLE: u8 = 1;

// Settlement fee split, in basis points of the total pool
pub const REFEREE_FEE_BPS: u64 = 300; // 3%
pub const PLATFORM_FEE_BPS: u64 = 50; // 0.5%
pub const BPS_DENOMINATOR: u64 = 10_000;

// Contract read cache
pub const MATCH_CACHE_TTL_SECS: u64 = 30;

// Pagination limits
pub const LIST_LIMIT_DEFAULT: u64 = 50;
pub const LIST_LIMIT_MAX: u64 = 100;
pub const RECENT_LIMIT_DEFAULT: usize = 10;
pub const RECENT_LIMIT_MAX: usize = 50;
pub const TOP_PLAYERS_LEN: usize = 5;

// Oracle background service intervals
pub const EVENT_SCAN_INTERVAL_SECS: u64 = 15;
pub const EVENT_SCAN_BACKFILL_BLOCKS: u64 = 128;
pub const SETTLE_CHECK_INTERVAL_SECS: u64 = 300;

// Default RPC endpoint (Polkadot Asset Hub EVM testnet)
pub const DEFAULT_RPC_URL: &str = "https://testnet-passet-hub-eth-rpc.polkadot.io";

// API version
pub const API_VERSION: &str = "v1";
