//! Just enough Solidity ABI to talk to the boost contract.
//!
//! Every value the contract exchanges is a 32-byte word except `string`, which
//! is an offset in the head pointing at a length-prefixed, right-padded tail.

use anyhow::{bail, ensure, Context, Result};

pub const WORD: usize = 32;

/// First four bytes of `keccak256(signature)`, 0x-prefixed.
pub fn selector(signature: &str) -> String {
    let hash = keccak256(signature.as_bytes());
    format!("0x{}", hex::encode(&hash[..4]))
}

fn keccak256(data: &[u8]) -> [u8; 32] {
    use tiny_keccak::{Hasher, Keccak};
    let mut keccak = Keccak::v256();
    keccak.update(data);
    let mut out = [0u8; 32];
    keccak.finalize(&mut out);
    out
}

/// A single argument to an outgoing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Uint(u128),
    Address([u8; 20]),
    String(String),
}

/// Encode `selector ++ abi.encode(args)` as 0x-prefixed calldata.
pub fn encode_call(signature: &str, args: &[Token]) -> String {
    let mut head: Vec<u8> = Vec::with_capacity(args.len() * WORD);
    let mut tail: Vec<u8> = Vec::new();
    let head_len = args.len() * WORD;

    for arg in args {
        match arg {
            Token::Uint(v) => head.extend_from_slice(&uint_word(*v)),
            Token::Address(a) => {
                let mut word = [0u8; WORD];
                word[12..].copy_from_slice(a);
                head.extend_from_slice(&word);
            }
            Token::String(s) => {
                head.extend_from_slice(&uint_word((head_len + tail.len()) as u128));
                tail.extend_from_slice(&uint_word(s.len() as u128));
                tail.extend_from_slice(s.as_bytes());
                let padding = (WORD - s.len() % WORD) % WORD;
                tail.extend(std::iter::repeat(0u8).take(padding));
            }
        }
    }

    format!("{}{}{}", selector(signature), hex::encode(head), hex::encode(tail))
}

fn uint_word(v: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&v.to_be_bytes());
    word
}

/// Offset arithmetic on values read from untrusted return data.
pub(crate) fn offset_add(a: usize, b: usize) -> Result<usize> {
    a.checked_add(b)
        .with_context(|| format!("ABI offset {} + {} overflows", a, b))
}

/// Cursor over ABI-encoded return data.
pub struct Decoder<'a> {
    data: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn word(&self, offset: usize) -> Result<&'a [u8]> {
        let end = offset_add(offset, WORD)?;
        self.data
            .get(offset..end)
            .with_context(|| format!("return data too short for word at {}", offset))
    }

    /// uint256 at `offset`; values wider than 128 bits are rejected.
    pub fn uint(&self, offset: usize) -> Result<u128> {
        let word = self.word(offset)?;
        ensure!(
            word[..16].iter().all(|b| *b == 0),
            "uint256 at {} does not fit in 128 bits",
            offset
        );
        let mut buf = [0u8; 16];
        buf.copy_from_slice(&word[16..]);
        Ok(u128::from_be_bytes(buf))
    }

    pub fn usize(&self, offset: usize) -> Result<usize> {
        usize::try_from(self.uint(offset)?).context("ABI offset out of range")
    }

    pub fn bool(&self, offset: usize) -> Result<bool> {
        match self.uint(offset)? {
            0 => Ok(false),
            1 => Ok(true),
            other => bail!("invalid bool value {}", other),
        }
    }

    pub fn address(&self, offset: usize) -> Result<String> {
        let word = self.word(offset)?;
        Ok(format!("0x{}", hex::encode(&word[12..])))
    }

    /// `string` whose head slot sits at `offset`; the pointer is relative to `base`.
    pub fn string(&self, base: usize, offset: usize) -> Result<String> {
        let start = offset_add(base, self.usize(offset)?)?;
        let len = self.usize(start)?;
        let body = offset_add(start, WORD)?;
        let bytes = self
            .data
            .get(body..offset_add(body, len)?)
            .context("string extends past end of return data")?;
        String::from_utf8(bytes.to_vec()).context("string is not valid UTF-8")
    }

    /// Decoder rebased at `offset`, for nested dynamic tuples.
    pub fn at(&self, offset: usize) -> Result<Decoder<'a>> {
        let data = self
            .data
            .get(offset..)
            .context("nested offset past end of return data")?;
        Ok(Decoder { data })
    }
}

/// Decode 0x-prefixed return data into bytes.
pub fn decode_hex(data: &str) -> Result<Vec<u8>> {
    let stripped = data
        .strip_prefix("0x")
        .or_else(|| data.strip_prefix("0X"))
        .unwrap_or(data);
    hex::decode(stripped).context("invalid hex return data")
}

/// Parse a 0x-prefixed hex quantity (e.g. a balance or block number).
pub fn parse_hex_u128(hex_str: &str) -> Result<u128> {
    let stripped = hex_str
        .strip_prefix("0x")
        .or_else(|| hex_str.strip_prefix("0X"))
        .unwrap_or(hex_str);
    if stripped.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(stripped, 16).context("invalid hex quantity")
}

/// Parse a 0x-prefixed hex address string into 20 bytes.
pub fn parse_hex_address(hex_str: &str) -> Result<[u8; 20]> {
    let stripped = hex_str
        .strip_prefix("0x")
        .or_else(|| hex_str.strip_prefix("0X"))
        .context("address must start with 0x")?;
    if stripped.len() != 40 {
        bail!("expected 20 bytes (40 hex chars), got {}", stripped.len());
    }
    let bytes = hex::decode(stripped).context("invalid hex")?;
    let mut out = [0u8; 20];
    out.copy_from_slice(&bytes);
    Ok(out)
}
