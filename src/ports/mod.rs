pub mod registry;
pub mod token;

use alloy::primitives::B256;

/// Minimal transaction receipt returned by collaborator executions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub success: bool,
}
