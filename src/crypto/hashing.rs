use alloy::primitives::{b256, keccak256, Address, B256, U256};

use crate::domain::trade::{BidParams, SaleParams};

/// Protocol name bound into the signing domain.
pub const PROTOCOL_NAME: &str = "LINKED_TRADE_VALIDATOR";

/// Protocol version bound into the signing domain.
pub const PROTOCOL_VERSION: &str = "1";

/// Fixed domain salt. Changing it invalidates every issued signature.
pub const DOMAIN_SALT: B256 =
    b256!("655a1a74fd1fd2f7e6c46ade40b9f2a19b8b1bd4e1bd849bbcedcbd0ab6cd4d2");

const EIP712_DOMAIN_TYPE: &[u8] =
    b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract,bytes32 salt)";

/// Canonical trade tuple. The field order is a wire contract shared with
/// off-chain signers; reordering breaks signature compatibility.
const TRADE_TYPE: &[u8] = b"Trade(address seller,address bidder,address sellerToken,\
address bidderToken,bytes32 sellerInputNote,bytes32 bidderOutputNote,\
bytes32 bidderInputNote,bytes32 sellerOutputNote,uint256 saleExpiry,uint256 bidExpiry)";

/// The four note hashes that link the two sides of a trade: each side's
/// proof contributes its first input and first output commitment.
///
/// Named fields rather than positional arguments, so every call site agrees
/// on one canonical ordering by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkedNoteHashes {
    pub seller_input: B256,
    pub bidder_output: B256,
    pub bidder_input: B256,
    pub seller_output: B256,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TradeHashError {
    /// A side's expiry block height has already passed. Non-retriable; the
    /// trade must be renegotiated with fresh expiries.
    #[error("{side} expired: expiry block {expiry}, current block {current_block}")]
    TradeExpired {
        side: &'static str,
        expiry: u64,
        current_block: u64,
    },
}

/// Domain separator binding signatures to this protocol, chain, and
/// deployed validator identity. Stable within one deployment; any change of
/// chain id or validator address yields a different separator, preventing
/// cross-chain and cross-deployment replay.
pub fn domain_separator(chain_id: u64, validator: Address, salt: B256) -> B256 {
    let mut buf = Vec::with_capacity(32 * 6);
    buf.extend_from_slice(keccak256(EIP712_DOMAIN_TYPE).as_slice());
    buf.extend_from_slice(keccak256(PROTOCOL_NAME.as_bytes()).as_slice());
    buf.extend_from_slice(keccak256(PROTOCOL_VERSION.as_bytes()).as_slice());
    buf.extend_from_slice(&U256::from(chain_id).to_be_bytes::<32>());
    buf.extend_from_slice(B256::left_padding_from(validator.as_slice()).as_slice());
    buf.extend_from_slice(salt.as_slice());
    keccak256(&buf)
}

/// Struct-hash over the canonical trade tuple.
///
/// Expiries are checked here, at hash time, so a trade can never be
/// authorized for a block height that has already passed.
pub fn hash_trade_terms(
    sale: &SaleParams,
    bid: &BidParams,
    notes: &LinkedNoteHashes,
    current_block: u64,
) -> Result<B256, TradeHashError> {
    if sale.expiry <= current_block {
        return Err(TradeHashError::TradeExpired {
            side: "sale",
            expiry: sale.expiry,
            current_block,
        });
    }
    if bid.expiry <= current_block {
        return Err(TradeHashError::TradeExpired {
            side: "bid",
            expiry: bid.expiry,
            current_block,
        });
    }

    let mut buf = Vec::with_capacity(32 * 11);
    buf.extend_from_slice(keccak256(TRADE_TYPE).as_slice());
    buf.extend_from_slice(B256::left_padding_from(sale.seller.as_slice()).as_slice());
    buf.extend_from_slice(B256::left_padding_from(bid.bidder.as_slice()).as_slice());
    buf.extend_from_slice(B256::left_padding_from(sale.token.as_slice()).as_slice());
    buf.extend_from_slice(B256::left_padding_from(bid.token.as_slice()).as_slice());
    buf.extend_from_slice(notes.seller_input.as_slice());
    buf.extend_from_slice(notes.bidder_output.as_slice());
    buf.extend_from_slice(notes.bidder_input.as_slice());
    buf.extend_from_slice(notes.seller_output.as_slice());
    buf.extend_from_slice(&U256::from(sale.expiry).to_be_bytes::<32>());
    buf.extend_from_slice(&U256::from(bid.expiry).to_be_bytes::<32>());
    Ok(keccak256(&buf))
}

/// Computes the signing digests for one validator deployment.
///
/// The domain separator is fixed at construction from the deployment's chain
/// id and on-chain identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeHasher {
    domain_separator: B256,
}

impl TradeHasher {
    pub fn new(chain_id: u64, validator: Address) -> Self {
        Self {
            domain_separator: domain_separator(chain_id, validator, DOMAIN_SALT),
        }
    }

    pub fn domain_separator(&self) -> B256 {
        self.domain_separator
    }

    /// The digest the bidder signs: `keccak256(0x19 0x01 ‖ domain ‖ struct)`.
    ///
    /// Must match byte-for-byte what off-chain signers compute. The 2-byte
    /// prefix keeps a trade digest from verifying as any other message type.
    pub fn hash_for_signing(
        &self,
        sale: &SaleParams,
        bid: &BidParams,
        notes: &LinkedNoteHashes,
        current_block: u64,
    ) -> Result<B256, TradeHashError> {
        let struct_hash = hash_trade_terms(sale, bid, notes, current_block)?;
        let mut buf = Vec::with_capacity(2 + 64);
        buf.extend_from_slice(&[0x19, 0x01]);
        buf.extend_from_slice(self.domain_separator.as_slice());
        buf.extend_from_slice(struct_hash.as_slice());
        Ok(keccak256(&buf))
    }
}
