use std::collections::HashMap;

use alloy::primitives::{Address, B256};

use crate::crypto::hashing::{LinkedNoteHashes, TradeHashError, TradeHasher};
use crate::crypto::signature::{recover_signer, InvalidSignature};
use crate::domain::notes::{
    first_proof_output, note_section_hash, ExtractedNotes, MalformedProofOutput,
};
use crate::domain::trade::{BidParams, MalformedTradeParams, SaleParams};
use crate::ports::registry::{ProofRegistry, RegistryError, ASSET_TRANSFER_PROOF};
use crate::ports::token::{ConfidentialToken, TokenError};
use crate::ports::TxReceipt;

/// Error type for settlement failures. Every variant aborts the whole call
/// with zero side effects; none is retriable as-is.
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("malformed proof output: {0}")]
    MalformedProofOutput(#[from] MalformedProofOutput),

    #[error("malformed trade parameters: {0}")]
    MalformedTradeParams(#[from] MalformedTradeParams),

    #[error("registry rejected proof output {hash} for submitter {submitter}")]
    UnauthorizedProof { hash: B256, submitter: Address },

    #[error("proof output has {inputs} input / {outputs} output notes, need at least 1 / 2")]
    InvalidNoteCount { inputs: usize, outputs: usize },

    #[error(transparent)]
    TradeExpired(#[from] TradeHashError),

    #[error(transparent)]
    InvalidSignature(#[from] InvalidSignature),

    #[error("recovered signer does not match the declared bidder")]
    InvalidTradeSignature,

    #[error("bidder token mismatch: sale params say {sale}, bid params say {bid}")]
    TokenMismatch { sale: Address, bid: Address },

    #[error("no token registered for {0}")]
    UnknownToken(Address),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("token error: {0}")]
    Token(#[from] TokenError),
}

/// The eight arguments of the settlement entry point, grouped.
///
/// `seller_params` / `bidder_params` are the fixed-offset blobs of
/// [`SaleParams`] / [`BidParams`]; the proof outputs are registry-validated
/// bundles; the signature proofs and proof data are opaque to the engine and
/// handed through to the token contracts unchanged.
#[derive(Debug, Clone, Copy)]
pub struct SettlementRequest<'a> {
    pub seller_params: &'a [u8],
    pub bidder_params: &'a [u8],
    pub seller_proof_outputs: &'a [u8],
    pub bidder_proof_outputs: &'a [u8],
    pub seller_signature_proof: &'a [u8],
    pub bidder_signature_proof: &'a [u8],
    pub seller_proof_data: &'a [u8],
    pub bidder_proof_data: &'a [u8],
}

/// Strip the proof output's length prefix, recompute the section hash, and
/// ask the registry oracle whether that hash is valid and attributable to
/// `expected_submitter`. On success, decode the notes and return the two
/// linking commitments: the first input and the first output note hash.
pub async fn extract_and_verify_note_hashes<R: ProofRegistry>(
    registry: &R,
    proof_output: &[u8],
    expected_submitter: Address,
) -> Result<(B256, B256), SettlementError> {
    let hash = note_section_hash(proof_output)?;
    let valid = registry
        .validate_proof_by_hash(ASSET_TRANSFER_PROOF, hash, expected_submitter)
        .await?;
    if !valid {
        return Err(SettlementError::UnauthorizedProof {
            hash,
            submitter: expected_submitter,
        });
    }

    let notes = ExtractedNotes::decode(proof_output)?;
    if notes.input_commitments.is_empty() || notes.output_commitments.len() < 2 {
        return Err(SettlementError::InvalidNoteCount {
            inputs: notes.input_commitments.len(),
            outputs: notes.output_commitments.len(),
        });
    }
    Ok((notes.input_commitments[0].0, notes.output_commitments[0].0))
}

/// Settlement engine for linked confidential trades.
///
/// Binds two registry-validated transfer proofs into one atomic trade:
/// verifies the bidder's signature over the exact trade terms, then executes
/// both sides' transfers through their token contracts, or neither.
///
/// Generic over `ProofRegistry` (proof validity oracle) and
/// `ConfidentialToken` (transfer execution). Tokens are registered by
/// address at construction.
pub struct SettlementEngine<R, T> {
    registry: R,
    tokens: HashMap<Address, T>,
    hasher: TradeHasher,
}

impl<R: ProofRegistry, T: ConfidentialToken> SettlementEngine<R, T> {
    pub fn new(
        chain_id: u64,
        validator: Address,
        registry: R,
        tokens: HashMap<Address, T>,
    ) -> Self {
        Self {
            registry,
            tokens,
            hasher: TradeHasher::new(chain_id, validator),
        }
    }

    /// The digest computer bound to this deployment. Off-chain signers use
    /// it to produce exactly the digest `verify_trade` checks.
    pub fn hasher(&self) -> &TradeHasher {
        &self.hasher
    }

    /// Verify that the bidder authorized this exact trade.
    ///
    /// Extracts and oracle-checks both sides' linking note hashes, computes
    /// the signing digest (expiries are checked there, before any signature
    /// work), recovers the signer, and compares it to the declared bidder.
    /// `Ok(false)` means a well-formed signature by the wrong key; malformed
    /// inputs and expired trades surface as errors.
    pub async fn verify_trade(
        &self,
        sale: &SaleParams,
        bid: &BidParams,
        seller_proof_output: &[u8],
        bidder_proof_output: &[u8],
        current_block: u64,
    ) -> Result<bool, SettlementError> {
        let (seller_input, seller_output) =
            extract_and_verify_note_hashes(&self.registry, seller_proof_output, sale.seller)
                .await?;
        let (bidder_input, bidder_output) =
            extract_and_verify_note_hashes(&self.registry, bidder_proof_output, bid.bidder)
                .await?;

        let notes = LinkedNoteHashes {
            seller_input,
            bidder_output,
            bidder_input,
            seller_output,
        };
        let digest = self.hasher.hash_for_signing(sale, bid, &notes, current_block)?;
        let recovered = recover_signer(digest, &bid.signature)?;
        Ok(recovered == bid.bidder)
    }

    /// Settle a linked trade: verify the bidder's authorization, then
    /// execute both transfers, all or nothing.
    ///
    /// Single pass, no retries. Any failure before execution aborts with no
    /// side effect; during execution, both legs are prepared before either
    /// commits, and a failed leg rolls the other back. Commits run in
    /// seller-then-bidder order.
    pub async fn settle_linked_trade(
        &self,
        request: &SettlementRequest<'_>,
        current_block: u64,
    ) -> Result<(TxReceipt, TxReceipt), SettlementError> {
        let sale = SaleParams::decode(request.seller_params)?;
        let bid = BidParams::decode(request.bidder_params)?;

        // The bidder token appears in both blobs; a disagreement would let a
        // signature verify against one token while execution dispatches to
        // another.
        if sale.bidder_token != bid.token {
            return Err(SettlementError::TokenMismatch {
                sale: sale.bidder_token,
                bid: bid.token,
            });
        }

        let seller_output = first_proof_output(request.seller_proof_outputs)?;
        let bidder_output = first_proof_output(request.bidder_proof_outputs)?;

        if !self
            .verify_trade(&sale, &bid, seller_output, bidder_output, current_block)
            .await?
        {
            return Err(SettlementError::InvalidTradeSignature);
        }

        // The seller address doubles as the shared transfer authorizer; both
        // token identities come from the sale params.
        let authorizer = sale.seller;
        let seller_token = self
            .tokens
            .get(&sale.token)
            .ok_or(SettlementError::UnknownToken(sale.token))?;
        let bidder_token = self
            .tokens
            .get(&sale.bidder_token)
            .ok_or(SettlementError::UnknownToken(sale.bidder_token))?;

        let seller_prepared = seller_token
            .prepare_trade(
                request.seller_proof_outputs,
                request.seller_signature_proof,
                request.seller_proof_data,
                authorizer,
            )
            .await?;
        let bidder_prepared = match bidder_token
            .prepare_trade(
                request.bidder_proof_outputs,
                request.bidder_signature_proof,
                request.bidder_proof_data,
                authorizer,
            )
            .await
        {
            Ok(prepared) => prepared,
            Err(err) => {
                // The staged seller leg must not outlive the failed call.
                seller_token.rollback(seller_prepared).await?;
                return Err(err.into());
            }
        };

        let seller_receipt = match seller_token.commit(seller_prepared).await {
            Ok(receipt) => receipt,
            Err(err) => {
                bidder_token.rollback(bidder_prepared).await?;
                return Err(err.into());
            }
        };
        let bidder_receipt = bidder_token.commit(bidder_prepared).await?;

        Ok((seller_receipt, bidder_receipt))
    }
}
