//! Settlement split preview.
//!
//! Mirrors the contract's payout math so the API can show what a match pays
//! out before it settles: the full pool goes to the winner minus a 3% referee
//! fee and a 0.5% platform fee, both computed in basis points over the pool.

use ethers::types::U256;
use serde::Serialize;

use crate::constants::{
    BPS_DENOMINATOR, PLATFORM_FEE_BPS, REFEREE_FEE_BPS, STATUS_CANCELLED, STATUS_COMPLETED,
    ZERO_ADDRESS,
};
use crate::models::Match;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementBreakdown {
    pub pool_wei: String,
    pub referee_fee_wei: String,
    pub platform_fee_wei: String,
    pub winner_payout_wei: String,
}

pub fn settlement_breakdown(stake: U256, joined_participants: u64) -> SettlementBreakdown {
    let pool = stake * U256::from(joined_participants);
    let referee_fee = pool * U256::from(REFEREE_FEE_BPS) / U256::from(BPS_DENOMINATOR);
    let platform_fee = pool * U256::from(PLATFORM_FEE_BPS) / U256::from(BPS_DENOMINATOR);
    let winner_payout = pool - referee_fee - platform_fee;

    SettlementBreakdown {
        pool_wei: pool.to_string(),
        referee_fee_wei: referee_fee.to_string(),
        platform_fee_wei: platform_fee.to_string(),
        winner_payout_wei: winner_payout.to_string(),
    }
}

/// Payout preview for a match that can still settle. Completed and cancelled
/// matches have already paid out or refunded, so they get no preview.
pub fn payout_preview(m: &Match) -> Option<SettlementBreakdown> {
    if m.status == STATUS_COMPLETED || m.status == STATUS_CANCELLED {
        return None;
    }

    let joined = m
        .participants
        .iter()
        .filter(|p| p.as_str() != ZERO_ADDRESS)
        .count() as u64;
    if joined == 0 {
        return None;
    }

    let stake = U256::from_dec_str(&m.stake_amount_wei).ok()?;
    Some(settlement_breakdown(stake, joined))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

    #[test]
    fn two_player_one_ether_pool_splits_exactly() {
        // 2 ETH pool: 3% referee, 0.5% platform, remainder to the winner.
        let breakdown = settlement_breakdown(U256::from(ONE_ETHER), 2);
        assert_eq!(breakdown.pool_wei, "2000000000000000000");
        assert_eq!(breakdown.referee_fee_wei, "60000000000000000");
        assert_eq!(breakdown.platform_fee_wei, "10000000000000000");
        assert_eq!(breakdown.winner_payout_wei, "1930000000000000000");
    }

    #[test]
    fn fees_round_down_on_indivisible_pools() {
        let breakdown = settlement_breakdown(U256::from(3_u64), 2);
        // 6 wei pool; both fees truncate to zero, winner takes everything.
        assert_eq!(breakdown.referee_fee_wei, "0");
        assert_eq!(breakdown.platform_fee_wei, "0");
        assert_eq!(breakdown.winner_payout_wei, "6");
    }

    #[test]
    fn preview_skips_settled_and_empty_matches() {
        let zero = ZERO_ADDRESS;
        let base = Match {
            id: 1,
            mode: 0,
            referee: "0xR".into(),
            creator: "0xA".into(),
            participants: ["0xA".into(), "0xB".into()],
            stake_amount_wei: ONE_ETHER.to_string(),
            status: 1,
            winner: zero.into(),
            created_at: 0,
            start_time: 0,
            end_time: 0,
            description: String::new(),
            external_match_id: String::new(),
            is_settled: false,
        };

        assert!(payout_preview(&base).is_some());

        let mut completed = base.clone();
        completed.status = STATUS_COMPLETED;
        assert!(payout_preview(&completed).is_none());

        let mut vacant = base;
        vacant.participants = [zero.into(), zero.into()];
        assert!(payout_preview(&vacant).is_none());
    }
}
