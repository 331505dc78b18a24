//! Misc utils

use ethers::{types::Address, utils::to_checksum};

/// Serializes an address as its checksummed string form
pub fn as_checksum<S>(val: &Address, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_str(&to_checksum(val, None))
}
