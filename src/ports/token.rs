use alloy::primitives::{Address, B256};
use std::future::Future;

use super::TxReceipt;

/// Handle to a transfer staged by [`ConfidentialToken::prepare_trade`] and
/// not yet committed. Opaque to the engine; meaningful only to the token
/// that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreparedTrade(pub B256);

/// Port for a confidential-asset token contract executing one side of a
/// linked trade.
///
/// The transfer is split into an explicit two-phase commit so a dual-sided
/// settlement can be all-or-nothing even without a surrounding transactional
/// environment: `prepare_trade` performs every check and stages the balance
/// effects without making them visible, `commit` finalizes them, `rollback`
/// discards them. Once a transfer is prepared, `commit` must only fail on
/// transport faults; the engine cannot unwind a partially committed trade.
///
/// Implementations:
/// - `EthereumZkToken` (alloy RPC; prepare simulates via `eth_call`)
/// - `MockZkToken` for testing
pub trait ConfidentialToken: Send + Sync {
    /// Verify the transfer's proof bundle and stage its effects.
    ///
    /// `proof_outputs` is the registry-validated output bundle,
    /// `signature_proof` the token-level spending authorization,
    /// `proof_data` the raw proof for the token's own re-validation, and
    /// `authorizer` the identity on whose behalf notes are spent.
    fn prepare_trade(
        &self,
        proof_outputs: &[u8],
        signature_proof: &[u8],
        proof_data: &[u8],
        authorizer: Address,
    ) -> impl Future<Output = Result<PreparedTrade, TokenError>> + Send;

    /// Make a prepared transfer's effects final.
    fn commit(
        &self,
        prepared: PreparedTrade,
    ) -> impl Future<Output = Result<TxReceipt, TokenError>> + Send;

    /// Discard a prepared transfer, releasing its staged effects.
    fn rollback(
        &self,
        prepared: PreparedTrade,
    ) -> impl Future<Output = Result<(), TokenError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("transfer rejected: {0}")]
    TransferRejected(String),

    #[error("unknown prepared transfer: {0}")]
    UnknownPrepared(B256),

    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    #[error("RPC error: {0}")]
    Rpc(String),
}
