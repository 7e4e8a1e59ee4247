use alloy::primitives::{keccak256, Address, B256};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};

use crate::domain::trade::TradeSignature;

/// The signature could not be interpreted or recovered. Non-retriable;
/// signals fraud, corruption, or a stale signature.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid signature: {reason}")]
pub struct InvalidSignature {
    pub reason: &'static str,
}

/// Recover the Ethereum-style address that produced `signature` over
/// `digest`.
///
/// Enforces the canonical form before touching the curve: `v` must be 27 or
/// 28, `r`/`s` must be non-zero field elements, and `s` must be in the low
/// half of the group order (rejecting the malleable twin of every
/// signature). A recovered zero address is rejected rather than returned.
pub fn recover_signer(
    digest: B256,
    signature: &TradeSignature,
) -> Result<Address, InvalidSignature> {
    let recovery_id = match signature.v {
        27 => RecoveryId::from_byte(0),
        28 => RecoveryId::from_byte(1),
        _ => None,
    }
    .ok_or(InvalidSignature {
        reason: "v outside canonical {27, 28}",
    })?;

    let mut bytes = [0u8; 64];
    bytes[..32].copy_from_slice(signature.r.as_slice());
    bytes[32..].copy_from_slice(signature.s.as_slice());
    let sig = Signature::from_slice(&bytes).map_err(|_| InvalidSignature {
        reason: "r or s outside field range",
    })?;
    if sig.normalize_s().is_some() {
        return Err(InvalidSignature {
            reason: "non-canonical high-s form",
        });
    }

    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &sig, recovery_id)
        .map_err(|_| InvalidSignature {
            reason: "public key recovery failed",
        })?;

    let signer = address_of(&key);
    if signer == Address::ZERO {
        return Err(InvalidSignature {
            reason: "recovered the zero address",
        });
    }
    Ok(signer)
}

/// Ethereum address of a verifying key: last 20 bytes of the keccak of the
/// uncompressed point, SEC1 tag stripped.
fn address_of(key: &VerifyingKey) -> Address {
    let encoded = key.to_encoded_point(false);
    let digest = keccak256(&encoded.as_bytes()[1..]);
    Address::from_slice(&digest[12..])
}

/// Host-side convenience: sign a 32-byte digest, returning the `(r, s, v)`
/// form [`recover_signer`] accepts. Signatures come out low-s normalized
/// with `v` in {27, 28}.
pub fn sign_digest(digest: B256, key: &SigningKey) -> Result<TradeSignature, InvalidSignature> {
    let (sig, recovery_id) = key
        .sign_prehash_recoverable(digest.as_slice())
        .map_err(|_| InvalidSignature {
            reason: "signing failed",
        })?;
    let bytes = sig.to_bytes();
    Ok(TradeSignature {
        r: B256::from_slice(&bytes[..32]),
        s: B256::from_slice(&bytes[32..]),
        v: 27 + recovery_id.to_byte(),
    })
}

/// Ethereum address controlled by a signing key.
pub fn signer_address(key: &SigningKey) -> Address {
    address_of(key.verifying_key())
}
