use std::collections::HashMap;
use std::sync::Arc;

use alloy::{
    network::EthereumWallet,
    primitives::{Address, Bytes, B256},
    providers::{DynProvider, ProviderBuilder},
    signers::local::PrivateKeySigner,
    sol,
};
use tokio::sync::Mutex;

use crate::ports::registry::{ProofRegistry, RegistryError};
use crate::ports::token::{ConfidentialToken, PreparedTrade, TokenError};
use crate::ports::TxReceipt;

sol! {
    #[sol(rpc)]
    interface IZkAsset {
        function confidentialTrade(
            bytes calldata proofOutputs,
            bytes calldata signatureProof,
            bytes calldata proofData,
            address authorizer
        ) external;
    }

    #[sol(rpc)]
    interface IProofRegistry {
        function validateProof(
            uint32 proofType,
            address submitter,
            bytes calldata proofData
        ) external returns (bytes memory);

        function validateProofByHash(
            uint32 proofType,
            bytes32 hash,
            address signer
        ) external view returns (bool);
    }
}

fn build_provider(rpc_url: &str, private_key: &str) -> Result<DynProvider, String> {
    let signer: PrivateKeySigner = private_key
        .parse()
        .map_err(|e| format!("invalid private key: {e}"))?;
    let wallet = EthereumWallet::from(signer);
    Ok(DynProvider::new(
        ProviderBuilder::new().wallet(wallet).connect_http(
            rpc_url
                .parse()
                .map_err(|e| format!("invalid RPC URL: {e}"))?,
        ),
    ))
}

fn convert_receipt(receipt: &alloy::rpc::types::TransactionReceipt) -> TxReceipt {
    TxReceipt {
        tx_hash: receipt.transaction_hash,
        success: receipt.status(),
    }
}

/// Proof registry adapter over an on-chain registry contract.
#[derive(Clone)]
pub struct EthereumRegistry {
    provider: DynProvider,
    registry: Address,
}

impl EthereumRegistry {
    pub fn new(rpc_url: &str, private_key: &str, registry: Address) -> Result<Self, RegistryError> {
        Ok(Self {
            provider: build_provider(rpc_url, private_key).map_err(RegistryError::Rpc)?,
            registry,
        })
    }
}

impl ProofRegistry for EthereumRegistry {
    async fn validate_proof(
        &self,
        proof_type: u32,
        submitter: Address,
        proof_data: &[u8],
    ) -> Result<Bytes, RegistryError> {
        let registry = IProofRegistry::new(self.registry, &self.provider);
        let call = registry.validateProof(proof_type, submitter, Bytes::copy_from_slice(proof_data));

        // Simulate first to read the proof outputs, then land the
        // state-changing validation transaction.
        let outputs = call
            .call()
            .await
            .map_err(|e| RegistryError::ProofRejected(e.to_string()))?;

        let receipt = call
            .send()
            .await
            .map_err(|e| RegistryError::Rpc(e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| RegistryError::Rpc(e.to_string()))?;
        if !receipt.status() {
            return Err(RegistryError::ProofRejected("validateProof reverted".into()));
        }

        Ok(outputs)
    }

    async fn validate_proof_by_hash(
        &self,
        proof_type: u32,
        hash: B256,
        signer: Address,
    ) -> Result<bool, RegistryError> {
        let registry = IProofRegistry::new(self.registry, &self.provider);
        registry
            .validateProofByHash(proof_type, hash, signer)
            .call()
            .await
            .map_err(|e| RegistryError::Rpc(e.to_string()))
    }
}

/// One transfer staged by `prepare_trade`, held until commit or rollback.
struct StagedCall {
    proof_outputs: Bytes,
    signature_proof: Bytes,
    proof_data: Bytes,
    authorizer: Address,
}

/// Confidential-token adapter over an on-chain zk-asset contract.
///
/// `prepare_trade` maps to an `eth_call` simulation of `confidentialTrade`
/// (every check the contract would run, no state change), `commit` lands the
/// real transaction, `rollback` just drops the staged call (nothing has
/// touched the chain yet).
#[derive(Clone)]
pub struct EthereumZkToken {
    provider: DynProvider,
    asset: Address,
    staged: Arc<Mutex<HashMap<B256, StagedCall>>>,
    next_id: Arc<Mutex<u64>>,
}

impl EthereumZkToken {
    pub fn new(rpc_url: &str, private_key: &str, asset: Address) -> Result<Self, TokenError> {
        Ok(Self {
            provider: build_provider(rpc_url, private_key).map_err(TokenError::Rpc)?,
            asset,
            staged: Arc::default(),
            next_id: Arc::default(),
        })
    }
}

impl ConfidentialToken for EthereumZkToken {
    async fn prepare_trade(
        &self,
        proof_outputs: &[u8],
        signature_proof: &[u8],
        proof_data: &[u8],
        authorizer: Address,
    ) -> Result<PreparedTrade, TokenError> {
        let asset = IZkAsset::new(self.asset, &self.provider);
        asset
            .confidentialTrade(
                Bytes::copy_from_slice(proof_outputs),
                Bytes::copy_from_slice(signature_proof),
                Bytes::copy_from_slice(proof_data),
                authorizer,
            )
            .call()
            .await
            .map_err(|e| TokenError::TransferRejected(e.to_string()))?;

        let id = {
            let mut next_id = self.next_id.lock().await;
            *next_id += 1;
            B256::left_padding_from(&next_id.to_be_bytes())
        };
        self.staged.lock().await.insert(
            id,
            StagedCall {
                proof_outputs: Bytes::copy_from_slice(proof_outputs),
                signature_proof: Bytes::copy_from_slice(signature_proof),
                proof_data: Bytes::copy_from_slice(proof_data),
                authorizer,
            },
        );
        Ok(PreparedTrade(id))
    }

    async fn commit(&self, prepared: PreparedTrade) -> Result<TxReceipt, TokenError> {
        let staged = self
            .staged
            .lock()
            .await
            .remove(&prepared.0)
            .ok_or(TokenError::UnknownPrepared(prepared.0))?;

        let asset = IZkAsset::new(self.asset, &self.provider);
        let receipt = asset
            .confidentialTrade(
                staged.proof_outputs,
                staged.signature_proof,
                staged.proof_data,
                staged.authorizer,
            )
            .send()
            .await
            .map_err(|e| TokenError::TransactionFailed(e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| TokenError::TransactionFailed(e.to_string()))?;

        if !receipt.status() {
            return Err(TokenError::TransactionFailed(
                "confidentialTrade reverted".into(),
            ));
        }

        Ok(convert_receipt(&receipt))
    }

    async fn rollback(&self, prepared: PreparedTrade) -> Result<(), TokenError> {
        self.staged
            .lock()
            .await
            .remove(&prepared.0)
            .ok_or(TokenError::UnknownPrepared(prepared.0))?;
        Ok(())
    }
}
