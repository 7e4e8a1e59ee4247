use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use alloy::primitives::{Address, Bytes, B256};
use tokio::sync::Mutex;

use super::mock_registry::MockProofRegistry;
use crate::domain::notes::{first_proof_output, note_section_hash};
use crate::ports::token::{ConfidentialToken, PreparedTrade, TokenError};
use crate::ports::TxReceipt;

/// Global commit sequence, shared across all mock tokens so tests can
/// assert cross-token execution order.
static COMMIT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// One staged (prepared, uncommitted) confidential transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedTransfer {
    pub proof_outputs: Bytes,
    pub signature_proof: Bytes,
    pub proof_data: Bytes,
    pub authorizer: Address,
    /// Section hash of the bundle's first proof output.
    pub proof_hash: B256,
}

/// A committed transfer with its global sequence number.
#[derive(Debug, Clone)]
pub struct CommittedTransfer {
    pub sequence: u64,
    pub transfer: StagedTransfer,
}

#[derive(Default)]
struct TokenState {
    next_id: u64,
    prepared: HashMap<B256, StagedTransfer>,
    committed: Vec<CommittedTransfer>,
    rolled_back: Vec<StagedTransfer>,
    fail_next_prepare: Option<String>,
}

/// In-memory spy `ConfidentialToken` with real two-phase semantics.
///
/// `prepare_trade` validates the bundle shape and stages the transfer;
/// `commit` finalizes it (and, when linked to a [`MockProofRegistry`],
/// marks the proof's section hash spent so replays fail at the oracle);
/// `rollback` discards it. Every call is recorded for test assertions.
#[derive(Clone, Default)]
pub struct MockZkToken {
    inner: Arc<Mutex<TokenState>>,
    registry: Option<MockProofRegistry>,
}

impl MockZkToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link a registry: committed transfers consume their proof hash there.
    pub fn with_registry(registry: MockProofRegistry) -> Self {
        Self {
            inner: Arc::default(),
            registry: Some(registry),
        }
    }

    /// Make the next `prepare_trade` call fail with `reason`.
    pub async fn fail_next_prepare(&self, reason: &str) {
        self.inner.lock().await.fail_next_prepare = Some(reason.to_string());
    }

    pub async fn prepared_count(&self) -> usize {
        self.inner.lock().await.prepared.len()
    }

    pub async fn committed(&self) -> Vec<CommittedTransfer> {
        self.inner.lock().await.committed.clone()
    }

    pub async fn commit_count(&self) -> usize {
        self.inner.lock().await.committed.len()
    }

    pub async fn rollback_count(&self) -> usize {
        self.inner.lock().await.rolled_back.len()
    }
}

impl ConfidentialToken for MockZkToken {
    async fn prepare_trade(
        &self,
        proof_outputs: &[u8],
        signature_proof: &[u8],
        proof_data: &[u8],
        authorizer: Address,
    ) -> Result<PreparedTrade, TokenError> {
        let mut state = self.inner.lock().await;
        if let Some(reason) = state.fail_next_prepare.take() {
            return Err(TokenError::TransferRejected(reason));
        }

        // All validation happens here; commit must not be able to fail.
        let entry = first_proof_output(proof_outputs)
            .map_err(|e| TokenError::TransferRejected(e.to_string()))?;
        let proof_hash = note_section_hash(entry)
            .map_err(|e| TokenError::TransferRejected(e.to_string()))?;

        state.next_id += 1;
        let id = B256::left_padding_from(&state.next_id.to_be_bytes());
        state.prepared.insert(
            id,
            StagedTransfer {
                proof_outputs: Bytes::copy_from_slice(proof_outputs),
                signature_proof: Bytes::copy_from_slice(signature_proof),
                proof_data: Bytes::copy_from_slice(proof_data),
                authorizer,
                proof_hash,
            },
        );
        Ok(PreparedTrade(id))
    }

    async fn commit(&self, prepared: PreparedTrade) -> Result<TxReceipt, TokenError> {
        let staged = {
            let mut state = self.inner.lock().await;
            state
                .prepared
                .remove(&prepared.0)
                .ok_or(TokenError::UnknownPrepared(prepared.0))?
        };

        if let Some(registry) = &self.registry {
            registry.mark_spent(staged.proof_hash).await;
        }

        let sequence = COMMIT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let mut state = self.inner.lock().await;
        state.committed.push(CommittedTransfer {
            sequence,
            transfer: staged,
        });
        Ok(TxReceipt {
            tx_hash: prepared.0,
            success: true,
        })
    }

    async fn rollback(&self, prepared: PreparedTrade) -> Result<(), TokenError> {
        let mut state = self.inner.lock().await;
        let staged = state
            .prepared
            .remove(&prepared.0)
            .ok_or(TokenError::UnknownPrepared(prepared.0))?;
        state.rolled_back.push(staged);
        Ok(())
    }
}
