use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use alloy::primitives::{keccak256, Address, Bytes, B256};
use tokio::sync::Mutex;

use crate::domain::notes::{first_proof_output, note_section_hash, MalformedProofOutput};
use crate::ports::registry::{ProofRegistry, RegistryError};

/// In-memory `ProofRegistry` for testing and the demo.
///
/// Keeps the spent-proof record that gives proof outputs their at-most-once
/// lifecycle: a hash marked spent stops validating, so a second settlement
/// over the same commitments is rejected.
#[derive(Clone, Default)]
pub struct MockProofRegistry {
    inner: Arc<Mutex<RegistryState>>,
}

#[derive(Default)]
struct RegistryState {
    /// Section hash → (proof type, submitter) of an accepted proof output.
    accepted: HashMap<B256, (u32, Address)>,
    /// keccak(proof data) → (proof type, submitter, output bundle) for
    /// `validate_proof` lookups.
    staged: HashMap<B256, (u32, Address, Bytes)>,
    spent: HashSet<B256>,
}

impl MockProofRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a length-prefixed proof output as validated, keyed by its
    /// section hash. Returns the hash the oracle will answer for.
    pub async fn accept_proof_output(
        &self,
        proof_type: u32,
        submitter: Address,
        proof_output: &[u8],
    ) -> Result<B256, MalformedProofOutput> {
        let hash = note_section_hash(proof_output)?;
        let mut state = self.inner.lock().await;
        state.accepted.insert(hash, (proof_type, submitter));
        Ok(hash)
    }

    /// Stage raw proof data so `validate_proof` answers with `outputs`
    /// (a proof-output bundle).
    pub async fn stage_proof(
        &self,
        proof_type: u32,
        submitter: Address,
        proof_data: &[u8],
        outputs: Bytes,
    ) {
        let mut state = self.inner.lock().await;
        state
            .staged
            .insert(keccak256(proof_data), (proof_type, submitter, outputs));
    }

    /// Mark a proof-output hash as consumed. Subsequent
    /// `validate_proof_by_hash` calls for it answer `false`.
    pub async fn mark_spent(&self, hash: B256) {
        self.inner.lock().await.spent.insert(hash);
    }

    pub async fn is_spent(&self, hash: B256) -> bool {
        self.inner.lock().await.spent.contains(&hash)
    }
}

impl ProofRegistry for MockProofRegistry {
    async fn validate_proof(
        &self,
        proof_type: u32,
        submitter: Address,
        proof_data: &[u8],
    ) -> Result<Bytes, RegistryError> {
        let mut state = self.inner.lock().await;
        let outputs = match state.staged.get(&keccak256(proof_data)) {
            Some((staged_type, staged_submitter, outputs))
                if *staged_type == proof_type && *staged_submitter == submitter =>
            {
                outputs.clone()
            }
            Some(_) => {
                return Err(RegistryError::ProofRejected(
                    "proof type or submitter mismatch".into(),
                ))
            }
            None => return Err(RegistryError::ProofRejected("unknown proof data".into())),
        };

        // Acceptance is recorded, so validate_proof_by_hash vouches for the
        // returned outputs from here on.
        let hash = first_proof_output(&outputs)
            .and_then(note_section_hash)
            .map_err(|e| RegistryError::ProofRejected(e.to_string()))?;
        state.accepted.insert(hash, (proof_type, submitter));

        Ok(outputs)
    }

    async fn validate_proof_by_hash(
        &self,
        proof_type: u32,
        hash: B256,
        signer: Address,
    ) -> Result<bool, RegistryError> {
        let state = self.inner.lock().await;
        if state.spent.contains(&hash) {
            return Ok(false);
        }
        Ok(state.accepted.get(&hash) == Some(&(proof_type, signer)))
    }
}
