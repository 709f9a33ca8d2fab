//! Calls into the PaidCaster boost contract.
//!
//! Reads go through `eth_call`; writes are handed to a [`Wallet`] for signing.
//! The contract is the system of record for boosts and earnings: nothing here
//! assumes a write has taken effect until its receipt says so.

use anyhow::{Context, Result};
use serde::{Serialize, Serializer};

use super::{
    abi::{decode_hex, encode_call, offset_add, parse_hex_address, Decoder, Token, WORD},
    rpc::{Receipt, RpcClient},
    wallet::Wallet,
};

/// Deployed contract on Base mainnet.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x005FEFD5247Cbfbe230e6B2d5a71290B1861241B";

const SIG_CREATE_BOOST: &str = "createBoost(string,uint256,uint256)";
const SIG_RECAST_AND_EARN: &str = "recastAndEarn(uint256)";
const SIG_CLAIM_REWARDS: &str = "claimRewards()";
const SIG_GET_ACTIVE_BOOSTS: &str = "getActiveBoosts()";
const SIG_USER_EARNINGS: &str = "userEarnings(address)";
const SIG_BOOST_COUNTER: &str = "boostCounter()";
const SIG_BOOSTS: &str = "boosts(uint256)";

/// Head slots in an encoded `Boost` tuple.
const BOOST_FIELDS: usize = 9;

/// A boost as stored on-chain. Wei amounts serialize as decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Boost {
    pub id: u64,
    pub creator: String,
    pub cast_hash: String,
    #[serde(serialize_with = "decimal_string")]
    pub reward_pool: u128,
    #[serde(serialize_with = "decimal_string")]
    pub reward_per_recast: u128,
    pub max_recasts: u64,
    pub current_recasts: u64,
    pub is_active: bool,
    /// Unix seconds.
    pub created_at: u64,
}

impl Boost {
    pub fn is_full(&self) -> bool {
        self.current_recasts >= self.max_recasts
    }

    pub fn is_created_by(&self, account: &str) -> bool {
        self.creator.eq_ignore_ascii_case(account)
    }
}

fn decimal_string<S: Serializer>(v: &u128, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&v.to_string())
}

fn small(v: u128, field: &str) -> Result<u64> {
    u64::try_from(v).with_context(|| format!("{} out of range", field))
}

/// Decode one `Boost` tuple; `d` must be positioned at the tuple start.
fn decode_boost(d: &Decoder<'_>) -> Result<Boost> {
    Ok(Boost {
        id: small(d.uint(0)?, "id")?,
        creator: d.address(WORD)?,
        cast_hash: d.string(0, 2 * WORD)?,
        reward_pool: d.uint(3 * WORD)?,
        reward_per_recast: d.uint(4 * WORD)?,
        max_recasts: small(d.uint(5 * WORD)?, "maxRecasts")?,
        current_recasts: small(d.uint(6 * WORD)?, "currentRecasts")?,
        is_active: d.bool(7 * WORD)?,
        created_at: small(d.uint(8 * WORD)?, "createdAt")?,
    })
}

/// Decode the return data of `getActiveBoosts()`.
pub fn decode_boost_list(data: &[u8]) -> Result<Vec<Boost>> {
    let d = Decoder::new(data);
    let array_start = d.usize(0)?;
    let len = d.usize(array_start)?;
    let elems = d.at(offset_add(array_start, WORD)?)?;

    (0..len)
        .map(|i| {
            let slot = i.checked_mul(WORD).context("boost index overflows")?;
            let offset = elems.usize(slot)?;
            decode_boost(&elems.at(offset)?).with_context(|| format!("boost #{}", i))
        })
        .collect()
}

/// Decode the return data of `boosts(uint256)`.
pub fn decode_single_boost(data: &[u8]) -> Result<Boost> {
    anyhow::ensure!(
        data.len() >= BOOST_FIELDS * WORD,
        "boost return data too short: {} bytes",
        data.len()
    );
    decode_boost(&Decoder::new(data))
}

#[derive(Clone)]
pub struct BoostContract {
    rpc: RpcClient,
    address: String,
}

impl BoostContract {
    pub fn new(rpc: RpcClient, address: impl Into<String>) -> Self {
        Self {
            rpc,
            address: address.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn read(&self, signature: &str, args: &[Token]) -> Result<Vec<u8>> {
        let calldata = encode_call(signature, args);
        let result = self
            .rpc
            .eth_call(&self.address, &calldata)
            .await
            .with_context(|| format!("{} call failed", signature))?;
        decode_hex(&result)
    }

    pub async fn active_boosts(&self) -> Result<Vec<Boost>> {
        let data = self.read(SIG_GET_ACTIVE_BOOSTS, &[]).await?;
        decode_boost_list(&data)
    }

    /// Read one boost, active or not. Unknown ids read back as a zeroed
    /// struct and map to `None`.
    pub async fn boost(&self, id: u64) -> Result<Option<Boost>> {
        let data = self.read(SIG_BOOSTS, &[Token::Uint(id as u128)]).await?;
        let boost = decode_single_boost(&data)?;
        Ok((boost.id == id && boost.created_at != 0).then_some(boost))
    }

    pub async fn boost_counter(&self) -> Result<u64> {
        let data = self.read(SIG_BOOST_COUNTER, &[]).await?;
        small(Decoder::new(&data).uint(0)?, "boostCounter")
    }

    /// Unclaimed rewards of `account`, in wei.
    pub async fn user_earnings(&self, account: &str) -> Result<u128> {
        let addr = parse_hex_address(account)?;
        let data = self
            .read(SIG_USER_EARNINGS, &[Token::Address(addr)])
            .await?;
        Decoder::new(&data).uint(0)
    }

    /// Fund a new boost. `value` must equal `reward_per_recast * max_recasts`.
    pub async fn create_boost(
        &self,
        wallet: &Wallet,
        cast_hash: &str,
        reward_per_recast: u128,
        max_recasts: u64,
    ) -> Result<Receipt> {
        let deposit = reward_per_recast
            .checked_mul(max_recasts as u128)
            .context("boost deposit overflows")?;
        let data = encode_call(
            SIG_CREATE_BOOST,
            &[
                Token::String(cast_hash.to_string()),
                Token::Uint(reward_per_recast),
                Token::Uint(max_recasts as u128),
            ],
        );
        wallet.transact(&self.address, data, deposit).await
    }

    pub async fn recast_and_earn(&self, wallet: &Wallet, boost_id: u64) -> Result<Receipt> {
        let data = encode_call(SIG_RECAST_AND_EARN, &[Token::Uint(boost_id as u128)]);
        wallet.transact(&self.address, data, 0).await
    }

    pub async fn claim_rewards(&self, wallet: &Wallet) -> Result<Receipt> {
        let data = encode_call(SIG_CLAIM_REWARDS, &[]);
        wallet.transact(&self.address, data, 0).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn word(v: u128) -> Vec<u8> {
        let mut w = vec![0u8; WORD];
        w[16..].copy_from_slice(&v.to_be_bytes());
        w
    }

    fn addr_word(last: u8) -> Vec<u8> {
        let mut w = vec![0u8; WORD];
        w[31] = last;
        w
    }

    fn string_tail(s: &str) -> Vec<u8> {
        let mut out = word(s.len() as u128);
        out.extend_from_slice(s.as_bytes());
        out.resize(WORD + s.len().div_ceil(WORD) * WORD, 0);
        out
    }

    /// ABI-encode one `Boost` tuple (head + tail).
    pub(crate) fn encode_boost(b: &Boost, creator_last: u8) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(word(b.id as u128));
        out.extend(addr_word(creator_last));
        out.extend(word((BOOST_FIELDS * WORD) as u128));
        out.extend(word(b.reward_pool));
        out.extend(word(b.reward_per_recast));
        out.extend(word(b.max_recasts as u128));
        out.extend(word(b.current_recasts as u128));
        out.extend(word(b.is_active as u128));
        out.extend(word(b.created_at as u128));
        out.extend(string_tail(&b.cast_hash));
        out
    }

    /// ABI-encode `Boost[]` as returned by `getActiveBoosts()`.
    pub(crate) fn encode_boost_list(boosts: &[(Boost, u8)]) -> Vec<u8> {
        let encoded: Vec<Vec<u8>> = boosts.iter().map(|(b, c)| encode_boost(b, *c)).collect();
        let mut out = word(WORD as u128);
        out.extend(word(boosts.len() as u128));
        let mut offset = boosts.len() * WORD;
        for e in &encoded {
            out.extend(word(offset as u128));
            offset += e.len();
        }
        for e in encoded {
            out.extend(e);
        }
        out
    }

    pub(crate) fn sample(id: u64, creator_last: u8) -> Boost {
        Boost {
            id,
            creator: format!("0x{}{:02x}", "00".repeat(19), creator_last),
            cast_hash: format!("0xdeadbeefcafef00{}", id),
            reward_pool: 10_000_000_000_000_000,
            reward_per_recast: 1_000_000_000_000_000,
            max_recasts: 10,
            current_recasts: id,
            is_active: true,
            created_at: 1_700_000_000 + id,
        }
    }

    #[test]
    fn decodes_boost_list() {
        let boosts = vec![(sample(1, 0xaa), 0xaa), (sample(2, 0xbb), 0xbb)];
        let data = encode_boost_list(&boosts);
        let decoded = decode_boost_list(&data).unwrap();
        assert_eq!(decoded, vec![sample(1, 0xaa), sample(2, 0xbb)]);
    }

    #[test]
    fn decodes_empty_list() {
        let data = encode_boost_list(&[]);
        assert!(decode_boost_list(&data).unwrap().is_empty());
    }

    #[test]
    fn decodes_single_boost() {
        let b = sample(3, 0x01);
        assert_eq!(decode_single_boost(&encode_boost(&b, 0x01)).unwrap(), b);
        assert!(decode_single_boost(&[0u8; 64]).is_err());
    }

    #[test]
    fn boost_helpers() {
        let mut b = sample(1, 0xaa);
        assert!(b.is_created_by(&b.creator.to_uppercase().replace("0X", "0x")));
        assert!(!b.is_full());
        b.current_recasts = b.max_recasts;
        assert!(b.is_full());
    }

    #[test]
    fn amounts_serialize_as_strings() {
        let v = serde_json::to_value(sample(1, 0xaa)).unwrap();
        assert_eq!(v["rewardPerRecast"], "1000000000000000");
        assert_eq!(v["maxRecasts"], 10);
        assert_eq!(v["castHash"], "0xdeadbeefcafef001");
    }
    async fn contract_returning(data: Vec<u8>) -> (wiremock::MockServer, BoostContract) {
        use wiremock::{matchers::method, Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0", "id": 1, "result": format!("0x{}", hex::encode(data))
            })))
            .mount(&server)
            .await;
        let contract = BoostContract::new(RpcClient::new(server.uri()), DEFAULT_CONTRACT_ADDRESS);
        (server, contract)
    }

    #[test]
    fn huge_offsets_do_not_panic() {
        let mut data = vec![0u8; 24];
        data.extend_from_slice(&u64::MAX.to_be_bytes());
        assert!(decode_boost_list(&data).is_err());

        let mut single = vec![0u8; BOOST_FIELDS * WORD];
        single[2 * WORD + 24..3 * WORD].copy_from_slice(&u64::MAX.to_be_bytes());
        assert!(decode_single_boost(&single).is_err());
    }

    #[tokio::test]
    async fn reads_existing_boost() {
        let b = sample(4, 0x02);
        let (_server, contract) = contract_returning(encode_boost(&b, 0x02)).await;
        assert_eq!(contract.boost(4).await.unwrap(), Some(b));
    }

    #[tokio::test]
    async fn unknown_boost_reads_as_none() {
        let (_server, contract) = contract_returning(vec![0u8; BOOST_FIELDS * WORD]).await;
        assert_eq!(contract.boost(99).await.unwrap(), None);
    }
}
