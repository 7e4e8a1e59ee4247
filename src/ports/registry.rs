use alloy::primitives::{Address, Bytes, B256};
use std::future::Future;

/// Proof type identifier for confidential asset-transfer proofs.
pub const ASSET_TRANSFER_PROOF: u32 = 1;

/// Port for the external proof registry: the authoritative oracle for
/// "is this exact proof-output hash valid and attributable to this
/// submitter for this proof type".
///
/// The registry also keeps the spent-proof record: once a proof output is
/// consumed by a settlement, `validate_proof_by_hash` must stop vouching for
/// it, which is what makes replay of the same commitments impossible.
///
/// Implementations:
/// - `EthereumRegistry` (alloy RPC)
/// - `MockProofRegistry` for testing
pub trait ProofRegistry: Send + Sync {
    /// Validate raw proof data submitted by `submitter`, returning the
    /// proof-output bytes on acceptance.
    fn validate_proof(
        &self,
        proof_type: u32,
        submitter: Address,
        proof_data: &[u8],
    ) -> impl Future<Output = Result<Bytes, RegistryError>> + Send;

    /// Check that a previously validated proof output, keyed by its section
    /// hash, is attributable to `signer` and not yet consumed.
    fn validate_proof_by_hash(
        &self,
        proof_type: u32,
        hash: B256,
        signer: Address,
    ) -> impl Future<Output = Result<bool, RegistryError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("proof rejected: {0}")]
    ProofRejected(String),

    #[error("RPC error: {0}")]
    Rpc(String),
}
