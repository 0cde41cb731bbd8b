//! # Anchor Identifier Derivation
//!
//! Anchoring is simulated: identifiers are shaped like real ledger values
//! (`0x`-prefixed hex hashes and addresses, decimal token ids) but are
//! derived locally from SHA-256 over the passport id, platform, anchor time,
//! and a per-call nonce. Distinct nonces yield distinct identifiers even when
//! two anchors land on the same clock tick.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::identity::PassportId;
use crate::passport::BlockchainIdentifiers;

/// SHA-256 over the length-prefixed concatenation of `parts`.
///
/// Length prefixes keep `["ab", "c"]` and `["a", "bc"]` from colliding.
pub fn sha256_hex(parts: &[&[u8]]) -> String {
    to_hex(&sha256_parts(parts))
}

fn sha256_parts(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    hasher.finalize().into()
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Derive a full set of anchor identifiers.
pub fn derive_anchor_identifiers(
    passport_id: &PassportId,
    platform: &str,
    anchored_at: DateTime<Utc>,
    nonce: &[u8],
) -> BlockchainIdentifiers {
    let nanos = anchored_at
        .timestamp_nanos_opt()
        .unwrap_or_else(|| anchored_at.timestamp_micros().saturating_mul(1000));
    let time_bytes = nanos.to_be_bytes();
    let base: [&[u8]; 4] = [
        passport_id.as_str().as_bytes(),
        platform.as_bytes(),
        &time_bytes,
        nonce,
    ];

    let tx = sha256_parts(&base);
    let contract = sha256_parts(&[b"contract", &tx]);
    let token = sha256_parts(&[b"token", &tx]);

    let mut token_bytes = [0u8; 8];
    token_bytes.copy_from_slice(&token[..8]);

    BlockchainIdentifiers {
        platform: platform.to_string(),
        anchor_transaction_hash: Some(format!("0x{}", to_hex(&tx))),
        contract_address: Some(format!("0x{}", to_hex(&contract[..20]))),
        token_id: Some(u64::from_be_bytes(token_bytes).to_string()),
    }
}
