use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{Address, U256},
};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::{interval, Duration};

use crate::{
    chain::{self, DuelPlatform},
    config::Config,
    constants::{
        EVENT_SCAN_BACKFILL_BLOCKS, EVENT_SCAN_INTERVAL_SECS, MODE_ORACLE,
        SETTLE_CHECK_INTERVAL_SECS, STATUS_IN_PROGRESS, STATUS_WAITING,
    },
    error::{AppError, Result},
    services::{duel_platform::DuelPlatformService, result_feed::ResultSource},
};

type SignerContract = DuelPlatform<SignerMiddleware<Provider<Http>, LocalWallet>>;

#[derive(Debug, Clone)]
struct PendingMatch {
    external_match_id: String,
    end_time: u64,
}

/// Start/stop flag with a generation stamp. Loops capture the generation of
/// the `begin` that spawned them; a stop/start cycle bumps it, so loops from
/// an earlier start exit at their next tick instead of running alongside the
/// new pair.
struct RunState {
    running: AtomicBool,
    generation: AtomicU64,
}

impl RunState {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    /// Marks the service running and returns the new generation, or `None`
    /// if it was already running.
    fn begin(&self) -> Option<u64> {
        if self.running.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Clears the running flag; returns whether the service had been running.
    fn halt(&self) -> bool {
        self.running.swap(false, Ordering::SeqCst)
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.is_running() && self.generation.load(Ordering::SeqCst) == generation
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleStatus {
    pub is_running: bool,
    pub oracle_address: String,
    pub contract_address: String,
    pub network: String,
    pub pending_matches: usize,
}

/// Bridges off-chain results into on-chain settlements. Two background loops
/// run while the service is started: an event scan that tracks oracle-mode
/// matches as they are created, and a settlement pass that queries the result
/// feed for every tracked match whose end time has passed and submits the
/// winner through `submitResultByOracle`.
pub struct OracleService {
    contract: SignerContract,
    provider: Provider<Http>,
    oracle_address: Address,
    network: String,
    feed: Arc<dyn ResultSource>,
    duel: Arc<DuelPlatformService>,
    run_state: RunState,
    last_block: RwLock<u64>,
    pending: RwLock<HashMap<u64, PendingMatch>>,
}

impl OracleService {
    pub fn from_config(
        config: &Config,
        feed: Arc<dyn ResultSource>,
        duel: Arc<DuelPlatformService>,
    ) -> Result<Self> {
        let provider = chain::build_provider(config)?;

        let wallet = match &config.oracle_private_key {
            Some(key) => key
                .trim()
                .trim_start_matches("0x")
                .parse::<LocalWallet>()
                .map_err(|e| AppError::Internal(format!("Invalid oracle private key: {e}")))?,
            None => {
                // Ephemeral wallet for development; it cannot settle on a
                // contract that only authorizes the configured oracle.
                LocalWallet::new(&mut ethers::core::rand::thread_rng())
            }
        };
        let wallet = wallet.with_chain_id(config.chain_id);
        let oracle_address = wallet.address();

        let contract_address = chain::contract_address(config)?;
        let middleware = SignerMiddleware::new(provider.clone(), wallet);
        let contract = DuelPlatform::new(contract_address, Arc::new(middleware));

        tracing::info!(
            oracle = %chain::format_address(oracle_address),
            contract = %chain::format_address(contract_address),
            "Oracle service initialized"
        );

        Ok(Self {
            contract,
            provider,
            oracle_address,
            network: config.rpc_url.clone(),
            feed,
            duel,
            run_state: RunState::new(),
            last_block: RwLock::new(0),
            pending: RwLock::new(HashMap::new()),
        })
    }

    pub fn is_running(&self) -> bool {
        self.run_state.is_running()
    }

    /// Starts the event-scan and settlement loops. Idempotent: a second start
    /// while running is a no-op.
    pub fn start(self: Arc<Self>) {
        let Some(generation) = self.run_state.begin() else {
            tracing::warn!("Oracle service is already running");
            return;
        };
        tracing::info!("Oracle service started");

        let scanner = Arc::clone(&self);
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(EVENT_SCAN_INTERVAL_SECS));
            loop {
                ticker.tick().await;
                if !scanner.run_state.is_current(generation) {
                    break;
                }
                if let Err(e) = scanner.scan_events().await {
                    tracing::warn!("Event scan failed: {e}");
                }
            }
            tracing::info!("Oracle event scan stopped");
        });

        let settler = self;
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(SETTLE_CHECK_INTERVAL_SECS));
            loop {
                ticker.tick().await;
                if !settler.run_state.is_current(generation) {
                    break;
                }
                settler.check_pending_matches().await;
            }
            tracing::info!("Oracle settlement loop stopped");
        });
    }

    pub fn stop(&self) {
        if self.run_state.halt() {
            tracing::info!("Oracle service stopping");
        }
    }

    pub async fn status(&self) -> OracleStatus {
        OracleStatus {
            is_running: self.is_running(),
            oracle_address: chain::format_address(self.oracle_address),
            contract_address: chain::format_address(self.contract.address()),
            network: self.network.clone(),
            pending_matches: self.pending.read().await.len(),
        }
    }

    /// Polls contract logs since the last processed block. The first scan
    /// backfills a bounded window so a restart picks up recent matches.
    async fn scan_events(&self) -> Result<()> {
        let latest = self
            .provider
            .get_block_number()
            .await
            .map_err(|e| AppError::BlockchainRpc(format!("blockNumber failed: {e}")))?
            .as_u64();

        let last = *self.last_block.read().await;
        let from = if last == 0 {
            latest.saturating_sub(EVENT_SCAN_BACKFILL_BLOCKS)
        } else {
            last + 1
        };
        if from > latest {
            return Ok(());
        }

        let created = self
            .contract
            .match_created_filter()
            .from_block(from)
            .to_block(latest)
            .query()
            .await
            .map_err(|e| AppError::BlockchainRpc(format!("MatchCreated query failed: {e}")))?;
        for event in created {
            let match_id = event.match_id.as_u64();
            self.duel.invalidate_counter().await;
            if event.mode == MODE_ORACLE {
                self.track_match(match_id).await;
            }
        }

        let started = self
            .contract
            .match_started_filter()
            .from_block(from)
            .to_block(latest)
            .query()
            .await
            .map_err(|e| AppError::BlockchainRpc(format!("MatchStarted query failed: {e}")))?;
        for event in started {
            let match_id = event.match_id.as_u64();
            tracing::info!(match_id, "Match started");
            self.duel.invalidate(match_id).await;
        }

        let settled = self
            .contract
            .match_settled_filter()
            .from_block(from)
            .to_block(latest)
            .query()
            .await
            .map_err(|e| AppError::BlockchainRpc(format!("MatchSettled query failed: {e}")))?;
        for event in settled {
            let match_id = event.match_id.as_u64();
            tracing::info!(match_id, winner = %chain::format_address(event.winner), "Match settled on-chain");
            self.pending.write().await.remove(&match_id);
            self.duel.invalidate(match_id).await;
        }

        *self.last_block.write().await = latest;
        Ok(())
    }

    async fn track_match(&self, match_id: u64) {
        let Some(m) = self.duel.match_by_id(match_id).await else {
            tracing::warn!(match_id, "Oracle match created but details unavailable");
            return;
        };
        if m.external_match_id.is_empty() {
            tracing::warn!(match_id, "Oracle match has no external match id; skipping");
            return;
        }
        tracing::info!(match_id, external = %m.external_match_id, "Tracking oracle match");
        self.pending.write().await.insert(
            match_id,
            PendingMatch {
                external_match_id: m.external_match_id,
                end_time: m.end_time,
            },
        );
    }

    /// One settlement pass over the tracked matches whose end time has passed.
    async fn check_pending_matches(&self) {
        let now = unix_now();
        let due: Vec<(u64, PendingMatch)> = {
            let pending = self.pending.read().await;
            due_matches(&pending, now)
                .into_iter()
                .filter_map(|id| pending.get(&id).map(|p| (id, p.clone())))
                .collect()
        };
        if due.is_empty() {
            return;
        }
        tracing::info!(count = due.len(), "Checking matches awaiting settlement");

        for (match_id, entry) in due {
            // Re-read chain state: someone may have settled or cancelled the
            // match since it was tracked.
            self.duel.invalidate(match_id).await;
            match self.duel.match_by_id(match_id).await {
                Some(m) if m.is_settled || !is_live(m.status) => {
                    self.pending.write().await.remove(&match_id);
                    continue;
                }
                Some(_) => {}
                None => continue,
            }

            match self.feed.winner_of(&entry.external_match_id).await {
                Ok(Some(winner)) => {
                    if let Err(e) = self.submit_result(match_id, winner).await {
                        tracing::error!(match_id, "Settlement submission failed: {e}");
                    }
                }
                Ok(None) => {
                    tracing::debug!(match_id, external = %entry.external_match_id, "Result not available yet");
                }
                Err(e) => {
                    tracing::warn!(match_id, "Result feed lookup failed: {e}");
                }
            }
        }
    }

    /// Submits a winner on-chain and waits for the receipt.
    pub async fn submit_result(&self, match_id: u64, winner: Address) -> Result<String> {
        tracing::info!(match_id, winner = %chain::format_address(winner), "Submitting result");

        let call = self
            .contract
            .submit_result_by_oracle(U256::from(match_id), winner);
        let pending_tx = call
            .send()
            .await
            .map_err(|e| AppError::BlockchainRpc(format!("submitResultByOracle failed: {e}")))?;
        let tx_hash = format!("{:#x}", *pending_tx);
        tracing::info!(match_id, tx_hash = %tx_hash, "Transaction sent");

        let receipt = pending_tx
            .await
            .map_err(|e| AppError::BlockchainRpc(format!("waiting for receipt failed: {e}")))?
            .ok_or_else(|| {
                AppError::BlockchainRpc(format!("transaction {tx_hash} dropped from mempool"))
            })?;

        if receipt.status != Some(1.into()) {
            return Err(AppError::TransactionReverted(format!(
                "settlement of match {match_id} reverted in tx {tx_hash}"
            )));
        }

        tracing::info!(
            match_id,
            block = receipt.block_number.map(|b| b.as_u64()).unwrap_or_default(),
            "Settlement confirmed"
        );
        self.pending.write().await.remove(&match_id);
        self.duel.invalidate(match_id).await;
        Ok(tx_hash)
    }

    /// Manual settlement trigger: fetches the result from the feed and submits
    /// it. A feed miss is reported as an error rather than swallowed.
    pub async fn manual_settle(&self, match_id: u64, external_match_id: &str) -> Result<String> {
        tracing::info!(match_id, external = external_match_id, "Manual settle triggered");

        let winner = self
            .feed
            .winner_of(external_match_id)
            .await?
            .ok_or_else(|| AppError::ResultPending(external_match_id.to_string()))?;

        self.submit_result(match_id, winner).await
    }
}

fn is_live(status: u8) -> bool {
    status == STATUS_WAITING || status == STATUS_IN_PROGRESS
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn due_matches(pending: &HashMap<u64, PendingMatch>, now: u64) -> Vec<u64> {
    let mut due: Vec<u64> = pending
        .iter()
        .filter(|(_, entry)| entry.end_time <= now)
        .map(|(id, _)| *id)
        .collect();
    due.sort_unstable();
    due
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(external: &str, end_time: u64) -> PendingMatch {
        PendingMatch {
            external_match_id: external.to_string(),
            end_time,
        }
    }

    #[test]
    fn due_matches_only_returns_ended_ones() {
        let mut pending = HashMap::new();
        pending.insert(3, entry("ext-3", 100));
        pending.insert(1, entry("ext-1", 50));
        pending.insert(2, entry("ext-2", 500));

        assert_eq!(due_matches(&pending, 100), vec![1, 3]);
        assert_eq!(due_matches(&pending, 49), Vec::<u64>::new());
        assert_eq!(due_matches(&pending, 1_000), vec![1, 2, 3]);
    }

    #[test]
    fn restart_within_a_tick_retires_loops_from_the_previous_start() {
        let state = RunState::new();

        let first = state.begin().unwrap();
        assert!(state.is_current(first));
        assert!(state.begin().is_none(), "second start must be a no-op");

        state.halt();
        assert!(!state.is_current(first));

        // Restart before the old loops have observed the halt: they must see
        // a stale generation and exit, while the new generation keeps running.
        let second = state.begin().unwrap();
        assert!(!state.is_current(first));
        assert!(state.is_current(second));

        state.halt();
        assert!(!state.is_current(second));
    }

    #[test]
    fn live_statuses_cover_waiting_and_in_progress() {
        assert!(is_live(STATUS_WAITING));
        assert!(is_live(STATUS_IN_PROGRESS));
        assert!(!is_live(crate::constants::STATUS_COMPLETED));
        assert!(!is_live(crate::constants::STATUS_CANCELLED));
    }
}
