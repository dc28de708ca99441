use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use ethers::types::{Address, U256};
use futures_util::future::join_all;
use tokio::sync::RwLock;

use crate::{
    chain::{self, ReadContract},
    constants::{
        LIST_LIMIT_DEFAULT, LIST_LIMIT_MAX, MATCH_CACHE_TTL_SECS, RECENT_LIMIT_MAX,
        STATUS_CANCELLED, STATUS_COMPLETED, STATUS_IN_PROGRESS, STATUS_WAITING, TOP_PLAYERS_LEN,
        ZERO_ADDRESS,
    },
    error::{AppError, Result},
    models::{Match, PlatformStats, RecentMatch, TopPlayer, UserStats},
};

#[derive(Clone)]
struct CachedMatch {
    fetched_at: Instant,
    value: Match,
}

#[derive(Debug, Default, Clone)]
pub struct ListQuery {
    pub status: Option<u8>,
    pub mode: Option<u8>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug)]
pub struct MatchPage {
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
    pub matches: Vec<Match>,
}

/// Read-through cache over the DuelPlatform contract. Matches are immutable
/// once completed, but waiting/in-progress ones change as players join, so
/// every entry expires on a short TTL and settlement invalidates eagerly.
pub struct DuelPlatformService {
    contract: ReadContract,
    cache_ttl: Duration,
    match_cache: RwLock<HashMap<u64, CachedMatch>>,
    counter_cache: RwLock<Option<(u64, Instant)>>,
}

impl DuelPlatformService {
    pub fn new(contract: ReadContract) -> Self {
        Self {
            contract,
            cache_ttl: Duration::from_secs(MATCH_CACHE_TTL_SECS),
            match_cache: RwLock::new(HashMap::new()),
            counter_cache: RwLock::new(None),
        }
    }

    pub async fn match_count(&self) -> Result<u64> {
        if let Some((value, fetched_at)) = *self.counter_cache.read().await {
            if fetched_at.elapsed() < self.cache_ttl {
                return Ok(value);
            }
        }

        let counter: U256 = self
            .contract
            .match_counter()
            .call()
            .await
            .map_err(|e| AppError::BlockchainRpc(format!("matchCounter failed: {e}")))?;
        let value = counter.as_u64();

        *self.counter_cache.write().await = Some((value, Instant::now()));
        Ok(value)
    }

    /// Fetches a single match, serving from cache within the TTL. An RPC
    /// failure is logged and yields None so one bad id never fails a listing.
    pub async fn match_by_id(&self, match_id: u64) -> Option<Match> {
        {
            let cache = self.match_cache.read().await;
            if let Some(entry) = cache.get(&match_id) {
                if entry.fetched_at.elapsed() < self.cache_ttl {
                    return Some(entry.value.clone());
                }
            }
        }

        match self.contract.get_match(U256::from(match_id)).call().await {
            Ok(raw) => {
                let m = chain::normalize_match(raw);
                self.match_cache.write().await.insert(
                    match_id,
                    CachedMatch {
                        fetched_at: Instant::now(),
                        value: m.clone(),
                    },
                );
                Some(m)
            }
            Err(e) => {
                tracing::warn!(match_id, "Failed to fetch match: {e}");
                None
            }
        }
    }

    pub async fn require_match(&self, match_id: u64) -> Result<Match> {
        self.match_by_id(match_id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("Match {match_id} not found")))
    }

    pub async fn matches_by_ids(&self, ids: &[u64]) -> Vec<Match> {
        let mut seen = HashSet::new();
        let unique: Vec<u64> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        join_all(unique.iter().map(|id| self.match_by_id(*id)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// Lists matches newest-first. Match ids are dense 0..matchCounter, so the
    /// listing walks backwards from the tail, skipping `offset` entries and
    /// post-filtering by status/mode until `limit` matches are collected.
    pub async fn list_matches(&self, query: ListQuery) -> Result<MatchPage> {
        let total = self.match_count().await?;
        let (limit, offset) = clamp_page(query.limit, query.offset);

        let mut matches = Vec::new();
        let Some(start) = scan_start(total, offset) else {
            return Ok(MatchPage {
                total,
                limit,
                offset,
                matches,
            });
        };

        let mut index = start as i64;
        while index >= 0 && (matches.len() as u64) < limit {
            let id = index as u64;
            index -= 1;

            let Some(m) = self.match_by_id(id).await else {
                continue;
            };
            if query.status.is_some_and(|s| m.status != s) {
                continue;
            }
            if query.mode.is_some_and(|mode| m.mode != mode) {
                continue;
            }
            matches.push(m);
        }

        Ok(MatchPage {
            total,
            limit,
            offset,
            matches,
        })
    }

    pub async fn user_stats(&self, address: Address) -> Result<UserStats> {
        let (total_matches, won_matches, total_staked, total_won) = self
            .contract
            .get_user_stats(address)
            .call()
            .await
            .map_err(|e| AppError::BlockchainRpc(format!("getUserStats failed: {e}")))?;

        let total = total_matches.as_u64();
        let won = won_matches.as_u64();

        Ok(UserStats {
            address: chain::format_address(address),
            total_matches: total,
            won_matches: won,
            losses: total.saturating_sub(won),
            win_rate: win_rate_pct(won, total),
            total_staked_wei: total_staked.to_string(),
            total_won_wei: total_won.to_string(),
        })
    }

    pub async fn user_match_ids(&self, address: Address) -> Result<Vec<u64>> {
        let ids: Vec<U256> = self
            .contract
            .get_user_matches(address)
            .call()
            .await
            .map_err(|e| AppError::BlockchainRpc(format!("getUserMatches failed: {e}")))?;
        Ok(ids.into_iter().map(|id| id.as_u64()).collect())
    }

    pub async fn user_matches(
        &self,
        address: Address,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<MatchPage> {
        let ids = self.user_match_ids(address).await?;
        let total = ids.len() as u64;
        let (limit, offset) = clamp_page(limit, offset);

        let page: Vec<u64> = ids
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();

        let mut matches = self.matches_by_ids(&page).await;
        matches.sort_by(|a, b| b.id.cmp(&a.id));

        Ok(MatchPage {
            total,
            limit,
            offset,
            matches,
        })
    }

    /// Aggregates platform-wide stats over every match on the contract. The
    /// full scan is acceptable at MVP scale and each fetch hits the TTL cache.
    pub async fn platform_stats(&self) -> Result<PlatformStats> {
        let total = self.match_count().await?;
        if total == 0 {
            return Ok(aggregate_platform_stats(0, &[]));
        }

        let ids: Vec<u64> = (0..total).collect();
        let matches = self.matches_by_ids(&ids).await;
        Ok(aggregate_platform_stats(total, &matches))
    }

    pub async fn recent_matches(&self, limit: usize) -> Result<Vec<RecentMatch>> {
        let stats = self.platform_stats().await?;
        Ok(stats.recent_matches.into_iter().take(limit).collect())
    }

    pub async fn invalidate(&self, match_id: u64) {
        self.match_cache.write().await.remove(&match_id);
    }

    pub async fn invalidate_counter(&self) {
        *self.counter_cache.write().await = None;
    }
}

/// Clamps a requested page to the configured bounds: limit 1..=100 with a
/// default of 50, offset defaulting to 0.
fn clamp_page(limit: Option<u64>, offset: Option<u64>) -> (u64, u64) {
    let limit = limit.unwrap_or(LIST_LIMIT_DEFAULT).clamp(1, LIST_LIMIT_MAX);
    (limit, offset.unwrap_or(0))
}

/// Index where a backward scan begins for the given page, or `None` when the
/// offset points past every match.
fn scan_start(total: u64, offset: u64) -> Option<u64> {
    if total == 0 || offset >= total {
        None
    } else {
        Some(total - 1 - offset)
    }
}

fn win_rate_pct(wins: u64, matches: u64) -> f64 {
    if matches == 0 {
        return 0.0;
    }
    let rate = (wins as f64 / matches as f64) * 100.0;
    (rate * 10.0).round() / 10.0
}

#[derive(Default)]
struct PlayerTally {
    matches: u64,
    wins: u64,
    volume: U256,
}

/// Pure aggregation over a match snapshot: status counters, distinct user
/// count, total staked volume, a top-five leaderboard, and the most recently
/// created matches (callers truncate to the page size they expose).
pub fn aggregate_platform_stats(total: u64, matches: &[Match]) -> PlatformStats {
    let mut waiting = 0_u64;
    let mut active = 0_u64;
    let mut completed = 0_u64;
    let mut cancelled = 0_u64;
    let mut total_volume = U256::zero();
    let mut players: HashMap<String, PlayerTally> = HashMap::new();

    for m in matches {
        match m.status {
            STATUS_WAITING => {
                waiting += 1;
                active += 1;
            }
            STATUS_IN_PROGRESS => active += 1,
            STATUS_COMPLETED => completed += 1,
            STATUS_CANCELLED => cancelled += 1,
            other => tracing::warn!(match_id = m.id, status = other, "Unknown match status"),
        }

        let stake = U256::from_dec_str(&m.stake_amount_wei).unwrap_or_default();
        let joined = m
            .participants
            .iter()
            .filter(|p| p.as_str() != ZERO_ADDRESS)
            .count();
        total_volume += stake * U256::from(joined as u64);

        for participant in m.participants.iter().filter(|p| p.as_str() != ZERO_ADDRESS) {
            let tally = players.entry(participant.clone()).or_default();
            tally.matches += 1;
            tally.volume += stake;
        }

        if m.winner != ZERO_ADDRESS {
            players.entry(m.winner.clone()).or_default().wins += 1;
        }
    }

    let total_users = players.len() as u64;

    let mut leaderboard: Vec<TopPlayer> = players
        .into_iter()
        .map(|(address, tally)| TopPlayer {
            address,
            wins: tally.wins,
            losses: tally.matches.saturating_sub(tally.wins),
            win_rate: win_rate_pct(tally.wins, tally.matches),
            volume_wei: tally.volume.to_string(),
        })
        .collect();
    leaderboard.sort_by(|a, b| {
        b.wins.cmp(&a.wins).then_with(|| {
            let a_vol = U256::from_dec_str(&a.volume_wei).unwrap_or_default();
            let b_vol = U256::from_dec_str(&b.volume_wei).unwrap_or_default();
            b_vol.cmp(&a_vol)
        })
    });
    leaderboard.truncate(TOP_PLAYERS_LEN);

    let mut by_created: Vec<&Match> = matches.iter().collect();
    by_created.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let recent_matches: Vec<RecentMatch> = by_created
        .into_iter()
        .take(RECENT_LIMIT_MAX)
        .map(|m| RecentMatch {
            id: m.id,
            description: if m.description.is_empty() {
                format!("Match #{}", m.id)
            } else {
                m.description.clone()
            },
            stake_amount_wei: m.stake_amount_wei.clone(),
            status: m.status,
            winner: m.winner.clone(),
            updated_at: if m.end_time > 0 {
                m.end_time
            } else {
                m.created_at
            },
        })
        .collect();

    PlatformStats {
        total_matches: total,
        waiting_matches: waiting,
        active_matches: active,
        completed_matches: completed,
        cancelled_matches: cancelled,
        total_users,
        total_volume_wei: total_volume.to_string(),
        top_players: leaderboard,
        recent_matches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAKE: &str = "1000000000000000000";

    fn addr(byte: u8) -> String {
        format!("0x{}", hex::encode([byte; 20]))
    }

    fn test_match(id: u64, status: u8, participants: [String; 2], winner: String) -> Match {
        Match {
            id,
            mode: 0,
            referee: addr(0xee),
            creator: participants[0].clone(),
            participants,
            stake_amount_wei: STAKE.to_string(),
            status,
            winner,
            created_at: 1000 + id,
            start_time: 2000 + id,
            end_time: if status == STATUS_COMPLETED { 3000 + id } else { 0 },
            description: String::new(),
            external_match_id: String::new(),
            is_settled: status == STATUS_COMPLETED,
        }
    }

    #[test]
    fn win_rate_rounds_to_one_decimal() {
        assert_eq!(win_rate_pct(0, 0), 0.0);
        assert_eq!(win_rate_pct(1, 3), 33.3);
        assert_eq!(win_rate_pct(2, 3), 66.7);
        assert_eq!(win_rate_pct(3, 3), 100.0);
    }

    #[test]
    fn aggregate_counts_statuses_and_volume() {
        let a = addr(0x01);
        let b = addr(0x02);
        let zero = ZERO_ADDRESS.to_string();

        let matches = vec![
            test_match(0, STATUS_WAITING, [a.clone(), zero.clone()], zero.clone()),
            test_match(1, STATUS_IN_PROGRESS, [a.clone(), b.clone()], zero.clone()),
            test_match(2, STATUS_COMPLETED, [a.clone(), b.clone()], a.clone()),
            test_match(3, STATUS_CANCELLED, [b.clone(), zero.clone()], zero.clone()),
        ];

        let stats = aggregate_platform_stats(4, &matches);
        assert_eq!(stats.waiting_matches, 1);
        assert_eq!(stats.active_matches, 2); // waiting + in-progress
        assert_eq!(stats.completed_matches, 1);
        assert_eq!(stats.cancelled_matches, 1);
        assert_eq!(stats.total_users, 2);
        // 1 + 2 + 2 + 1 = 6 joined stakes of 1 ETH each
        assert_eq!(stats.total_volume_wei, "6000000000000000000");
    }

    #[test]
    fn leaderboard_ranks_by_wins_then_volume() {
        let a = addr(0x01);
        let b = addr(0x02);
        let zero = ZERO_ADDRESS.to_string();

        // Both players have one win; b played (and staked) more.
        let matches = vec![
            test_match(0, STATUS_COMPLETED, [a.clone(), b.clone()], a.clone()),
            test_match(1, STATUS_COMPLETED, [a.clone(), b.clone()], b.clone()),
            test_match(2, STATUS_WAITING, [b.clone(), zero.clone()], zero),
        ];

        let stats = aggregate_platform_stats(3, &matches);
        assert_eq!(stats.top_players.len(), 2);
        assert_eq!(stats.top_players[0].address, b);
        assert_eq!(stats.top_players[0].wins, 1);
        assert_eq!(stats.top_players[1].address, a);
    }

    #[test]
    fn page_limits_clamp_to_the_configured_bounds() {
        assert_eq!(clamp_page(None, None), (LIST_LIMIT_DEFAULT, 0));
        assert_eq!(clamp_page(Some(0), Some(7)), (1, 7));
        assert_eq!(clamp_page(Some(1000), None), (LIST_LIMIT_MAX, 0));
        assert_eq!(clamp_page(Some(25), Some(3)), (25, 3));
    }

    #[test]
    fn backward_scan_starts_at_the_newest_unskipped_match() {
        assert_eq!(scan_start(10, 0), Some(9));
        assert_eq!(scan_start(10, 3), Some(6));
        assert_eq!(scan_start(10, 9), Some(0));
        assert_eq!(scan_start(10, 10), None);
        assert_eq!(scan_start(10, 500), None);
        assert_eq!(scan_start(0, 0), None);
    }

    #[test]
    fn recent_matches_are_newest_first_with_fallback_description() {
        let a = addr(0x01);
        let b = addr(0x02);

        let matches: Vec<Match> = (0..12)
            .map(|id| test_match(id, STATUS_COMPLETED, [a.clone(), b.clone()], a.clone()))
            .collect();

        let stats = aggregate_platform_stats(12, &matches);
        assert_eq!(stats.recent_matches.len(), 12);
        assert_eq!(stats.recent_matches[0].id, 11);
        assert_eq!(stats.recent_matches[0].description, "Match #11");
        // completed matches report their end time as the update marker
        assert_eq!(stats.recent_matches[0].updated_at, 3011);
    }

    #[test]
    fn empty_platform_yields_zeroed_stats() {
        let stats = aggregate_platform_stats(0, &[]);
        assert_eq!(stats.total_matches, 0);
        assert_eq!(stats.total_volume_wei, "0");
        assert!(stats.top_players.is_empty());
        assert!(stats.recent_matches.is_empty());
    }
}
