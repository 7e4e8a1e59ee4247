use alloy::primitives::{Address, Bytes, B256, U256};

/// Byte length of an encoded [`SaleParams`] blob.
pub const SALE_PARAMS_LEN: usize = 104;

/// Byte length of an encoded [`BidParams`] blob.
pub const BID_PARAMS_LEN: usize = 137;

/// Decode failures for trade parameter blobs. Non-retriable; the caller
/// must re-encode and resubmit.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MalformedTradeParams {
    #[error("parameter blob is {actual} bytes, expected {expected}")]
    WrongLength { expected: usize, actual: usize },

    #[error("expiry block height {0} does not fit in 64 bits")]
    ExpiryOutOfRange(U256),
}

/// A recoverable ECDSA signature in Ethereum's `(r, s, v)` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeSignature {
    pub r: B256,
    pub s: B256,
    /// Recovery byte, canonical values 27 and 28.
    pub v: u8,
}

/// Seller-side trade parameters ("base-call variant").
///
/// Wire layout, 104 bytes, big-endian:
///
/// ```text
/// [0,20)    seller address (also the shared transfer authorizer)
/// [20,40)   seller token address
/// [40,60)   bidder token address
/// [60,72)   zero padding
/// [72,104)  sale expiry block height (u256)
/// ```
///
/// The byte offsets are a compatibility contract with off-chain signers;
/// reordering any field invalidates every previously issued signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleParams {
    pub seller: Address,
    pub token: Address,
    /// The token the counterparty settles in. Must agree with
    /// [`BidParams::token`]; the settlement engine enforces this.
    pub bidder_token: Address,
    pub expiry: u64,
}

impl SaleParams {
    pub fn decode(blob: &[u8]) -> Result<Self, MalformedTradeParams> {
        if blob.len() != SALE_PARAMS_LEN {
            return Err(MalformedTradeParams::WrongLength {
                expected: SALE_PARAMS_LEN,
                actual: blob.len(),
            });
        }
        Ok(Self {
            seller: Address::from_slice(&blob[0..20]),
            token: Address::from_slice(&blob[20..40]),
            bidder_token: Address::from_slice(&blob[40..60]),
            expiry: decode_expiry(&blob[72..104])?,
        })
    }

    pub fn encode(&self) -> Bytes {
        let mut out = Vec::with_capacity(SALE_PARAMS_LEN);
        out.extend_from_slice(self.seller.as_slice());
        out.extend_from_slice(self.token.as_slice());
        out.extend_from_slice(self.bidder_token.as_slice());
        out.extend_from_slice(&[0u8; 12]);
        out.extend_from_slice(&U256::from(self.expiry).to_be_bytes::<32>());
        out.into()
    }
}

/// Bidder-side trade parameters, carrying the bidder's authorization
/// signature over the trade digest.
///
/// Wire layout, 137 bytes, big-endian:
///
/// ```text
/// [0,20)    bidder address
/// [20,40)   bidder token address
/// [40,72)   bid expiry block height (u256)
/// [72,104)  signature r
/// [104,136) signature s
/// [136,137) signature v
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BidParams {
    pub bidder: Address,
    pub token: Address,
    pub expiry: u64,
    pub signature: TradeSignature,
}

impl BidParams {
    pub fn decode(blob: &[u8]) -> Result<Self, MalformedTradeParams> {
        if blob.len() != BID_PARAMS_LEN {
            return Err(MalformedTradeParams::WrongLength {
                expected: BID_PARAMS_LEN,
                actual: blob.len(),
            });
        }
        Ok(Self {
            bidder: Address::from_slice(&blob[0..20]),
            token: Address::from_slice(&blob[20..40]),
            expiry: decode_expiry(&blob[40..72])?,
            signature: TradeSignature {
                r: B256::from_slice(&blob[72..104]),
                s: B256::from_slice(&blob[104..136]),
                v: blob[136],
            },
        })
    }

    pub fn encode(&self) -> Bytes {
        let mut out = Vec::with_capacity(BID_PARAMS_LEN);
        out.extend_from_slice(self.bidder.as_slice());
        out.extend_from_slice(self.token.as_slice());
        out.extend_from_slice(&U256::from(self.expiry).to_be_bytes::<32>());
        out.extend_from_slice(self.signature.r.as_slice());
        out.extend_from_slice(self.signature.s.as_slice());
        out.push(self.signature.v);
        out.into()
    }
}

fn decode_expiry(word: &[u8]) -> Result<u64, MalformedTradeParams> {
    let value = U256::from_be_slice(word);
    u64::try_from(value).map_err(|_| MalformedTradeParams::ExpiryOutOfRange(value))
}
