pub mod duel;

pub use duel::{
    ApiResponse, Match, PageMeta, PaginatedResponse, PlatformStats, RecentMatch, TopPlayer,
    UserStats,
};
