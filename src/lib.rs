//! Linked confidential-trade settlement.
//!
//! Two parties each hold a zero-knowledge proof of a confidential asset
//! transfer. This crate binds the two proofs into a single atomic trade:
//! it verifies that the bidder cryptographically authorized the exact trade
//! terms (parties, tokens, linking note commitments, expiries), and only
//! then executes both transfers through their token contracts, or neither.
//!
//! The proof system itself and the token contracts are opaque collaborators
//! behind the [`ports`] traits; [`adapters`] provides in-memory mocks and
//! alloy RPC implementations. The settlement state machine lives in
//! [`settlement`], the signing-digest scheme in [`crypto::hashing`].

pub mod adapters;
pub mod config;
pub mod crypto;
pub mod domain;
pub mod ports;
pub mod settlement;
