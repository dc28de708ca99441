use std::str::FromStr;
use std::sync::Arc;

use ethers::{
    providers::{Http, Provider},
    types::Address,
    utils::to_checksum,
};

use crate::{
    config::Config,
    error::{AppError, Result},
    models::Match,
};

// JSON ABI rather than the human-readable form: the human-readable parser
// flattens a lone struct return value into a tuple, while `internalType`
// metadata lets abigen emit `getMatch` returning the `MatchInfo` struct.
ethers::contract::abigen!(
    DuelPlatform,
    r#"[
        {"type":"function","name":"matchCounter","stateMutability":"view","inputs":[],
         "outputs":[{"name":"","type":"uint256","internalType":"uint256"}]},
        {"type":"function","name":"getMatch","stateMutability":"view",
         "inputs":[{"name":"matchId","type":"uint256","internalType":"uint256"}],
         "outputs":[{"name":"","type":"tuple","internalType":"struct DuelPlatform.MatchInfo","components":[
            {"name":"matchId","type":"uint256","internalType":"uint256"},
            {"name":"mode","type":"uint8","internalType":"uint8"},
            {"name":"referee","type":"address","internalType":"address"},
            {"name":"participants","type":"address[2]","internalType":"address[2]"},
            {"name":"stakeAmount","type":"uint256","internalType":"uint256"},
            {"name":"status","type":"uint8","internalType":"uint8"},
            {"name":"winner","type":"address","internalType":"address"},
            {"name":"createdAt","type":"uint256","internalType":"uint256"},
            {"name":"startTime","type":"uint256","internalType":"uint256"},
            {"name":"endTime","type":"uint256","internalType":"uint256"},
            {"name":"description","type":"string","internalType":"string"},
            {"name":"externalMatchId","type":"string","internalType":"string"},
            {"name":"isSettled","type":"bool","internalType":"bool"}]}]},
        {"type":"function","name":"getUserStats","stateMutability":"view",
         "inputs":[{"name":"user","type":"address","internalType":"address"}],
         "outputs":[
            {"name":"totalMatches","type":"uint256","internalType":"uint256"},
            {"name":"wonMatches","type":"uint256","internalType":"uint256"},
            {"name":"totalStaked","type":"uint256","internalType":"uint256"},
            {"name":"totalWon","type":"uint256","internalType":"uint256"}]},
        {"type":"function","name":"getUserMatches","stateMutability":"view",
         "inputs":[{"name":"user","type":"address","internalType":"address"}],
         "outputs":[{"name":"","type":"uint256[]","internalType":"uint256[]"}]},
        {"type":"function","name":"submitResultByOracle","stateMutability":"nonpayable",
         "inputs":[
            {"name":"matchId","type":"uint256","internalType":"uint256"},
            {"name":"winner","type":"address","internalType":"address"}],
         "outputs":[]},
        {"type":"event","name":"MatchCreated","anonymous":false,"inputs":[
            {"name":"matchId","type":"uint256","internalType":"uint256","indexed":true},
            {"name":"mode","type":"uint8","internalType":"uint8","indexed":false},
            {"name":"creator","type":"address","internalType":"address","indexed":true},
            {"name":"stakeAmount","type":"uint256","internalType":"uint256","indexed":false},
            {"name":"description","type":"string","internalType":"string","indexed":false}]},
        {"type":"event","name":"MatchStarted","anonymous":false,"inputs":[
            {"name":"matchId","type":"uint256","internalType":"uint256","indexed":true}]},
        {"type":"event","name":"MatchSettled","anonymous":false,"inputs":[
            {"name":"matchId","type":"uint256","internalType":"uint256","indexed":true},
            {"name":"winner","type":"address","internalType":"address","indexed":true},
            {"name":"payout","type":"uint256","internalType":"uint256","indexed":false}]},
        {"type":"event","name":"MatchCancelled","anonymous":false,"inputs":[
            {"name":"matchId","type":"uint256","internalType":"uint256","indexed":true}]}
    ]"#
);

pub fn build_provider(config: &Config) -> Result<Provider<Http>> {
    Provider::<Http>::try_from(config.rpc_url.as_str())
        .map_err(|e| AppError::Internal(format!("Invalid RPC URL: {}", e)))
}

pub fn parse_address(value: &str) -> Result<Address> {
    Address::from_str(value.trim()).map_err(|_| AppError::InvalidAddress(value.to_string()))
}

pub fn contract_address(config: &Config) -> Result<Address> {
    parse_address(&config.contract_address)
}

pub fn format_address(address: Address) -> String {
    to_checksum(&address, None)
}

/// Flattens the on-chain match tuple into the wire DTO. The creator is not
/// stored on-chain; the first occupied participant slot stands in for it,
/// falling back to the referee for matches nobody has joined.
pub fn normalize_match(raw: MatchInfo) -> Match {
    let participants = [
        format_address(raw.participants[0]),
        format_address(raw.participants[1]),
    ];

    let creator = raw
        .participants
        .iter()
        .copied()
        .find(|p| !p.is_zero())
        .unwrap_or(raw.referee);

    Match {
        id: raw.match_id.as_u64(),
        mode: raw.mode,
        referee: format_address(raw.referee),
        creator: format_address(creator),
        participants,
        stake_amount_wei: raw.stake_amount.to_string(),
        status: raw.status,
        winner: format_address(raw.winner),
        created_at: raw.created_at.as_u64(),
        start_time: raw.start_time.as_u64(),
        end_time: raw.end_time.as_u64(),
        description: raw.description,
        external_match_id: raw.external_match_id,
        is_settled: raw.is_settled,
    }
}

pub type ReadContract = DuelPlatform<Provider<Http>>;

pub fn build_read_contract(config: &Config) -> Result<ReadContract> {
    let provider = build_provider(config)?;
    let address = contract_address(config)?;
    Ok(DuelPlatform::new(address, Arc::new(provider)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::U256;

    fn raw_match(participants: [Address; 2], referee: Address) -> MatchInfo {
        MatchInfo {
            match_id: U256::from(7),
            mode: 0,
            referee,
            participants,
            stake_amount: U256::exp10(18),
            status: 0,
            winner: Address::zero(),
            created_at: U256::from(1_700_000_000_u64),
            start_time: U256::from(1_700_003_600_u64),
            end_time: U256::from(1_700_010_800_u64),
            description: "Pickleball singles".to_string(),
            external_match_id: String::new(),
            is_settled: false,
        }
    }

    #[test]
    fn normalize_uses_first_participant_as_creator() {
        let p1 = Address::repeat_byte(0x11);
        let referee = Address::repeat_byte(0x22);
        let m = normalize_match(raw_match([p1, Address::zero()], referee));
        assert_eq!(m.creator, format_address(p1));
        assert_eq!(m.id, 7);
        assert_eq!(m.stake_amount_wei, "1000000000000000000");
    }

    #[test]
    fn normalize_falls_back_to_referee_for_empty_match() {
        let referee = Address::repeat_byte(0x22);
        let m = normalize_match(raw_match([Address::zero(), Address::zero()], referee));
        assert_eq!(m.creator, format_address(referee));
    }

    #[test]
    fn parse_address_rejects_garbage() {
        assert!(parse_address("not-an-address").is_err());
        assert!(parse_address("0x1111111111111111111111111111111111111111").is_ok());
    }
}
