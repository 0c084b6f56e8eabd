// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Payment pipeline: reference generation, on-chain lookup, transfer
//! verification and ledger reconciliation.

pub mod reconcile;
pub mod reference;
pub mod resolver;
pub mod verifier;

pub use reconcile::{PaymentReconciler, PollRequest};
pub use reference::{new_reference, PaymentRequest, PAYMENT_URI_SCHEME};
pub use resolver::ReferenceResolver;
pub use verifier::PaymentVerifier;
