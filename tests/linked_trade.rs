//! End-to-end settlement over the public API with mock collaborators.
//!
//! The flow under test:
//! 1. The seller submits a proof yielding input hash H1 / output hash H2
//! 2. The bidder submits a proof yielding input hash H3 / output hash H4
//! 3. The bidder signs the trade digest over
//!    (seller, bidder, tokenA, tokenB, H1, H2, H3, H4, expiries)
//! 4. Settlement succeeds, and both token contracts observe exactly the
//!    proof bundles the hashes were extracted from

use std::collections::HashMap;

use alloy::primitives::{address, Address, Bytes, B256, I256};
use k256::ecdsa::SigningKey;

use linked_trade::adapters::mock_registry::MockProofRegistry;
use linked_trade::adapters::mock_token::MockZkToken;
use linked_trade::crypto::hashing::LinkedNoteHashes;
use linked_trade::crypto::signature::{sign_digest, signer_address};
use linked_trade::domain::notes::{encode_bundle, Commitment, ExtractedNotes};
use linked_trade::domain::trade::{BidParams, SaleParams, TradeSignature};
use linked_trade::ports::registry::ASSET_TRANSFER_PROOF;
use linked_trade::settlement::{SettlementEngine, SettlementError, SettlementRequest};

const CHAIN_ID: u64 = 1;
const CURRENT_BLOCK: u64 = 19_000_000;

const H1: B256 = B256::repeat_byte(0xA1); // seller input
const H2: B256 = B256::repeat_byte(0xA2); // seller output
const H3: B256 = B256::repeat_byte(0xB3); // bidder input
const H4: B256 = B256::repeat_byte(0xB4); // bidder output

fn validator() -> Address {
    address!("5555555555555555555555555555555555555555")
}

fn token_a() -> Address {
    address!("aaaa00000000000000000000000000000000aaaa")
}

fn token_b() -> Address {
    address!("bbbb00000000000000000000000000000000bbbb")
}

fn proof_entry(input: B256, output: B256, owner: Address) -> Bytes {
    ExtractedNotes {
        input_commitments: vec![Commitment(input)],
        output_commitments: vec![Commitment(output), Commitment(B256::repeat_byte(0xCC))],
        owner,
        public_value_delta: I256::ZERO,
    }
    .encode()
}

#[tokio::test]
async fn linked_trade_settles_end_to_end() {
    let seller = address!("1111111111111111111111111111111111111111");
    let bidder_key = SigningKey::from_slice(&[0x42; 32]).unwrap();
    let bidder = signer_address(&bidder_key);

    let registry = MockProofRegistry::new();
    let seller_token = MockZkToken::with_registry(registry.clone());
    let bidder_token = MockZkToken::with_registry(registry.clone());

    // 1–2: both sides' proofs accepted by the registry.
    let seller_entry = proof_entry(H1, H2, seller);
    let bidder_entry = proof_entry(H3, H4, bidder);
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
        expiry: CURRENT_BLOCK + 100,
    };
    let mut bid = BidParams {
        bidder,
        token: token_b(),
        expiry: CURRENT_BLOCK + 150,
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

    // 3: the bidder signs the digest over the four linking hashes.
    let digest = engine
        .hasher()
        .hash_for_signing(
            &sale,
            &bid,
            &LinkedNoteHashes {
                seller_input: H1,
                bidder_output: H4,
                bidder_input: H3,
                seller_output: H2,
            },
            CURRENT_BLOCK,
        )
        .unwrap();
    bid.signature = sign_digest(digest, &bidder_key).unwrap();

    // 4: settle.
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

    let (seller_receipt, bidder_receipt) = engine
        .settle_linked_trade(&request, CURRENT_BLOCK)
        .await
        .unwrap();
    assert!(seller_receipt.success);
    assert!(bidder_receipt.success);

    // Both collaborator transfers ran exactly once, seller first, and each
    // observed the exact bundle its linking hashes came from.
    let seller_commits = seller_token.committed().await;
    let bidder_commits = bidder_token.committed().await;
    assert_eq!(seller_commits.len(), 1);
    assert_eq!(bidder_commits.len(), 1);
    assert!(seller_commits[0].sequence < bidder_commits[0].sequence);
    assert_eq!(seller_commits[0].transfer.proof_outputs, seller_bundle);
    assert_eq!(bidder_commits[0].transfer.proof_outputs, bidder_bundle);
    assert_eq!(seller_commits[0].transfer.authorizer, seller);

    let decoded = ExtractedNotes::decode(&seller_commits[0].transfer.proof_outputs[32..]).unwrap();
    assert_eq!(decoded.input_commitments[0], Commitment(H1));
    assert_eq!(decoded.output_commitments[0], Commitment(H2));

    // The consumed proofs cannot settle a second trade.
    let err = engine
        .settle_linked_trade(&request, CURRENT_BLOCK)
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::UnauthorizedProof { .. }));
    assert_eq!(seller_token.commit_count().await, 1);
    assert_eq!(bidder_token.commit_count().await, 1);
}

#[tokio::test]
async fn signature_over_different_terms_does_not_settle() {
    let seller = address!("1111111111111111111111111111111111111111");
    let bidder_key = SigningKey::from_slice(&[0x42; 32]).unwrap();
    let bidder = signer_address(&bidder_key);

    let registry = MockProofRegistry::new();
    let seller_token = MockZkToken::new();
    let bidder_token = MockZkToken::new();

    let seller_entry = proof_entry(H1, H2, seller);
    let bidder_entry = proof_entry(H3, H4, bidder);
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
        expiry: CURRENT_BLOCK + 100,
    };
    let mut bid = BidParams {
        bidder,
        token: token_b(),
        expiry: CURRENT_BLOCK + 150,
        signature: TradeSignature {
            r: B256::ZERO,
            s: B256::ZERO,
            v: 27,
        },
    };

    let mut tokens = HashMap::new();
    tokens.insert(token_a(), seller_token.clone());
    tokens.insert(token_b(), bidder_token.clone());
    let engine = SettlementEngine::new(CHAIN_ID, validator(), registry, tokens);

    // The bidder signed for different note hashes than the proofs yield,
    // e.g. an earlier draft of the trade.
    let digest = engine
        .hasher()
        .hash_for_signing(
            &sale,
            &bid,
            &LinkedNoteHashes {
                seller_input: B256::repeat_byte(0xDD),
                bidder_output: H4,
                bidder_input: H3,
                seller_output: H2,
            },
            CURRENT_BLOCK,
        )
        .unwrap();
    bid.signature = sign_digest(digest, &bidder_key).unwrap();

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

    let err = engine
        .settle_linked_trade(&request, CURRENT_BLOCK)
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::InvalidTradeSignature));
    assert_eq!(seller_token.commit_count().await, 0);
    assert_eq!(bidder_token.commit_count().await, 0);
}
