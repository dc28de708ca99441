use serde::Serialize;

// ==================== MATCH ====================

/// Wire shape of an on-chain match. Addresses are checksummed strings, wei
/// amounts are decimal strings, and status/mode carry the raw contract codes
/// so the frontend sees the same JSON the contract tuple would produce.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: u64,
    pub mode: u8,
    pub referee: String,
    pub creator: String,
    pub participants: [String; 2],
    pub stake_amount_wei: String,
    pub status: u8,
    pub winner: String,
    pub created_at: u64,
    pub start_time: u64,
    pub end_time: u64,
    pub description: String,
    pub external_match_id: String,
    pub is_settled: bool,
}

// ==================== USER ====================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub address: String,
    pub total_matches: u64,
    pub won_matches: u64,
    pub losses: u64,
    pub win_rate: f64,
    pub total_staked_wei: String,
    pub total_won_wei: String,
}

// ==================== PLATFORM ====================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub total_matches: u64,
    pub waiting_matches: u64,
    pub active_matches: u64,
    pub completed_matches: u64,
    pub cancelled_matches: u64,
    pub total_users: u64,
    pub total_volume_wei: String,
    pub top_players: Vec<TopPlayer>,
    pub recent_matches: Vec<RecentMatch>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPlayer {
    pub address: String,
    pub wins: u64,
    pub losses: u64,
    pub win_rate: f64,
    pub volume_wei: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentMatch {
    pub id: u64,
    pub description: String,
    pub stake_amount_wei: String,
    pub status: u8,
    pub winner: String,
    pub updated_at: u64,
}

// ==================== ENVELOPES ====================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: u64, limit: u64, offset: u64) -> Self {
        Self {
            data,
            meta: PageMeta {
                total,
                limit,
                offset,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_response_success_sets_flag() {
        let resp = ApiResponse::success(1_u32);
        assert!(resp.success);
        assert_eq!(resp.data, 1);
    }

    #[test]
    fn match_serializes_camel_case() {
        let m = Match {
            id: 3,
            mode: 1,
            referee: "0xR".into(),
            creator: "0xC".into(),
            participants: ["0xA".into(), "0xB".into()],
            stake_amount_wei: "1000".into(),
            status: 2,
            winner: "0xA".into(),
            created_at: 10,
            start_time: 20,
            end_time: 30,
            description: "final".into(),
            external_match_id: "ext-9".into(),
            is_settled: true,
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["stakeAmountWei"], "1000");
        assert_eq!(json["externalMatchId"], "ext-9");
        assert_eq!(json["isSettled"], true);
    }
}
