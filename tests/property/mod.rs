//! Property-based tests for wrapchain.
//!
//! Run with: cargo test --test property_tests
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for transform pipelines and handler chains.
