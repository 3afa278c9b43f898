//! EIP-55 mixed-case checksum addresses

use tiny_keccak::{Hasher, Keccak};

use crate::query::is_address_candidate;
use crate::{Address, Error, Result};

/// Parse a `0x`-prefixed hex address (any letter case)
pub fn parse_address(raw: &str) -> Result<Address> {
    if !is_address_candidate(raw) {
        return Err(Error::InvalidFormat(format!("not an address: {raw}")));
    }

    let mut address = [0u8; 20];
    hex::decode_to_slice(&raw[2..], &mut address)
        .map_err(|e| Error::InvalidFormat(format!("{raw}: {e}")))?;
    Ok(address)
}

/// Encode an address with the EIP-55 checksum casing.
///
/// A hex letter is uppercased when the matching nibble of
/// `keccak256(lowercase_hex)` is 8 or greater.
pub fn checksum_address(address: &Address) -> String {
    let lower = hex::encode(address);

    let mut hash = [0u8; 32];
    let mut keccak = Keccak::v256();
    keccak.update(lower.as_bytes());
    keccak.finalize(&mut hash);

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            hash[i / 2] >> 4
        } else {
            hash[i / 2] & 0x0f
        };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Normalize any-case address text into its checksummed form
pub fn normalize_address(raw: &str) -> Result<String> {
    parse_address(raw).map(|address| checksum_address(&address))
}
