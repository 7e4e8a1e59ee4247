//! Linked-trade settlement demo.
//!
//! Runs the full settlement flow in-process with mock collaborators: two
//! parties with registered asset-transfer proofs, a bidder-signed trade
//! digest, and atomic dual-sided execution, plus a rejected trade showing
//! that a bad signature leaves both tokens untouched.
//!
//! Run with: `cargo run --bin demo`

use std::collections::HashMap;

use alloy::primitives::{address, Address, Bytes, B256, I256};
use k256::ecdsa::SigningKey;
use tracing::info;

use linked_trade::adapters::mock_registry::MockProofRegistry;
use linked_trade::adapters::mock_token::MockZkToken;
use linked_trade::crypto::hashing::LinkedNoteHashes;
use linked_trade::crypto::signature::{sign_digest, signer_address};
use linked_trade::domain::notes::{encode_bundle, note_section_hash, Commitment, ExtractedNotes};
use linked_trade::domain::trade::{BidParams, SaleParams, TradeSignature};
use linked_trade::ports::registry::{ProofRegistry, ASSET_TRANSFER_PROOF};
use linked_trade::settlement::{SettlementEngine, SettlementRequest};

const CHAIN_ID: u64 = 31337;
const CURRENT_BLOCK: u64 = 500;

fn validator() -> Address {
    address!("5555555555555555555555555555555555555555")
}

fn token_a() -> Address {
    address!("aaaa00000000000000000000000000000000aaaa")
}

fn token_b() -> Address {
    address!("bbbb00000000000000000000000000000000bbbb")
}

fn proof_output(owner: Address, seed: u8) -> Bytes {
    ExtractedNotes {
        input_commitments: vec![Commitment(B256::repeat_byte(seed))],
        output_commitments: vec![
            Commitment(B256::repeat_byte(seed + 1)),
            Commitment(B256::repeat_byte(seed + 2)),
        ],
        owner,
        public_value_delta: I256::ZERO,
    }
    .encode()
}

fn short(hash: B256) -> String {
    format!("0x{}...", &hex::encode(hash)[..16])
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("=== Linked Confidential-Trade Settlement ===");
    println!("=== Protocol Demo (mock collaborators) ===\n");

    scenario_settlement().await;
    println!("\n{}\n", "=".repeat(60));
    scenario_rejected_signature().await;

    println!("\n=== All scenarios completed ===");
}

async fn scenario_settlement() {
    println!("--- Scenario 1: Happy Path (Proofs → Signature → Atomic Execution) ---\n");

    // ── Setup ──
    println!("[Setup] Parties and collaborators...");
    let seller = address!("1111111111111111111111111111111111111111");
    let bidder_key = SigningKey::from_slice(&[0x42; 32]).unwrap();
    let bidder = signer_address(&bidder_key);
    println!("  seller: {seller}");
    println!("  bidder: {bidder}");

    let registry = MockProofRegistry::new();
    let seller_token = MockZkToken::with_registry(registry.clone());
    let bidder_token = MockZkToken::with_registry(registry.clone());

    // ── Proof submission ──
    println!("\n[Proofs] Submitting both sides' transfer proofs to the registry...");
    let seller_entry = proof_output(seller, 0x10);
    let bidder_entry = proof_output(bidder, 0x20);
    registry
        .stage_proof(
            ASSET_TRANSFER_PROOF,
            seller,
            b"seller-proof-data",
            encode_bundle(&[seller_entry.clone()]),
        )
        .await;
    registry
        .stage_proof(
            ASSET_TRANSFER_PROOF,
            bidder,
            b"bidder-proof-data",
            encode_bundle(&[bidder_entry.clone()]),
        )
        .await;

    let seller_bundle = registry
        .validate_proof(ASSET_TRANSFER_PROOF, seller, b"seller-proof-data")
        .await
        .unwrap();
    let bidder_bundle = registry
        .validate_proof(ASSET_TRANSFER_PROOF, bidder, b"bidder-proof-data")
        .await
        .unwrap();
    let seller_hash = note_section_hash(&seller_entry).unwrap();
    let bidder_hash = note_section_hash(&bidder_entry).unwrap();
    println!("  seller proof hash: {}", short(seller_hash));
    println!("  bidder proof hash: {}", short(bidder_hash));

    // ── Trade terms ──
    let sale = SaleParams {
        seller,
        token: token_a(),
        bidder_token: token_b(),
        expiry: CURRENT_BLOCK + 1_000,
    };
    let mut bid = BidParams {
        bidder,
        token: token_b(),
        expiry: CURRENT_BLOCK + 1_200,
        signature: TradeSignature {
            r: B256::ZERO,
            s: B256::ZERO,
            v: 27,
        },
    };

    let mut tokens = HashMap::new();
    tokens.insert(token_a(), seller_token.clone());
    tokens.insert(token_b(), bidder_token.clone());
    let engine = SettlementEngine::new(CHAIN_ID, validator(), registry.clone(), tokens);

    // ── Bidder signs the trade digest ──
    println!("\n[Signature] Bidder authorizes the exact trade terms...");
    let seller_notes = ExtractedNotes::decode(&seller_entry).unwrap();
    let bidder_notes = ExtractedNotes::decode(&bidder_entry).unwrap();
    let notes = LinkedNoteHashes {
        seller_input: seller_notes.input_commitments[0].0,
        bidder_output: bidder_notes.output_commitments[0].0,
        bidder_input: bidder_notes.input_commitments[0].0,
        seller_output: seller_notes.output_commitments[0].0,
    };
    let digest = engine
        .hasher()
        .hash_for_signing(&sale, &bid, &notes, CURRENT_BLOCK)
        .unwrap();
    bid.signature = sign_digest(digest, &bidder_key).unwrap();
    println!("  signing digest: {}", short(digest));

    // ── Settlement ──
    println!("\n[Settlement] Executing both transfers atomically...");
    let seller_params = sale.encode();
    let bidder_params = bid.encode();
    let request = SettlementRequest {
        seller_params: &seller_params,
        bidder_params: &bidder_params,
        seller_proof_outputs: &seller_bundle,
        bidder_proof_outputs: &bidder_bundle,
        seller_signature_proof: b"seller-signature-proof",
        bidder_signature_proof: b"bidder-signature-proof",
        seller_proof_data: b"seller-proof-data",
        bidder_proof_data: b"bidder-proof-data",
    };

    let (seller_receipt, bidder_receipt) = engine
        .settle_linked_trade(&request, CURRENT_BLOCK)
        .await
        .unwrap();
    info!(
        seller_tx = %seller_receipt.tx_hash,
        bidder_tx = %bidder_receipt.tx_hash,
        "trade settled"
    );
    println!("  seller transfer committed: {}", short(seller_receipt.tx_hash));
    println!("  bidder transfer committed: {}", short(bidder_receipt.tx_hash));
    println!(
        "  transfers per token: seller={}, bidder={}",
        seller_token.commit_count().await,
        bidder_token.commit_count().await,
    );
    println!(
        "  proofs consumed: seller={}, bidder={}",
        registry.is_spent(seller_hash).await,
        registry.is_spent(bidder_hash).await,
    );
}

async fn scenario_rejected_signature() {
    println!("--- Scenario 2: Wrong Signer (No Partial Execution) ---\n");

    let seller = address!("1111111111111111111111111111111111111111");
    let bidder_key = SigningKey::from_slice(&[0x42; 32]).unwrap();
    let bidder = signer_address(&bidder_key);
    let stranger_key = SigningKey::from_slice(&[0x77; 32]).unwrap();

    let registry = MockProofRegistry::new();
    let seller_token = MockZkToken::with_registry(registry.clone());
    let bidder_token = MockZkToken::with_registry(registry.clone());

    let seller_entry = proof_output(seller, 0x10);
    let bidder_entry = proof_output(bidder, 0x20);
    registry
        .accept_proof_output(ASSET_TRANSFER_PROOF, seller, &seller_entry)
        .await
        .unwrap();
    registry
        .accept_proof_output(ASSET_TRANSFER_PROOF, bidder, &bidder_entry)
        .await
        .unwrap();

    let sale = SaleParams {
        seller,
        token: token_a(),
        bidder_token: token_b(),
        expiry: CURRENT_BLOCK + 1_000,
    };
    // A stranger signs instead of the bidder.
    let bid = BidParams {
        bidder,
        token: token_b(),
        expiry: CURRENT_BLOCK + 1_200,
        signature: sign_digest(B256::repeat_byte(0x99), &stranger_key).unwrap(),
    };

    let mut tokens = HashMap::new();
    tokens.insert(token_a(), seller_token.clone());
    tokens.insert(token_b(), bidder_token.clone());
    let engine = SettlementEngine::new(CHAIN_ID, validator(), registry, tokens);

    let seller_params = sale.encode();
    let bidder_params = bid.encode();
    let seller_bundle = encode_bundle(&[seller_entry]);
    let bidder_bundle = encode_bundle(&[bidder_entry]);
    let request = SettlementRequest {
        seller_params: &seller_params,
        bidder_params: &bidder_params,
        seller_proof_outputs: &seller_bundle,
        bidder_proof_outputs: &bidder_bundle,
        seller_signature_proof: b"seller-signature-proof",
        bidder_signature_proof: b"bidder-signature-proof",
        seller_proof_data: b"seller-proof-data",
        bidder_proof_data: b"bidder-proof-data",
    };

    println!("[Settlement] Attempting settlement with a stranger's signature...");
    let err = engine
        .settle_linked_trade(&request, CURRENT_BLOCK)
        .await
        .unwrap_err();
    println!("  rejected: {err}");
    println!(
        "  transfers executed: seller={}, bidder={} (both untouched)",
        seller_token.commit_count().await,
        bidder_token.commit_count().await,
    );
}
