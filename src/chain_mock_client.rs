// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! A mock implementation of the chain client for tests.

use crate::chain_client::{ChainClientInner, RpcError};
use crate::types::TransactionDetail;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// Mock client used in test environments. Responses are pre-populated by
// the test before calling into the payment pipeline.
#[derive(Clone, Debug, Default)]
pub struct MockChainClient {
    references: Arc<Mutex<HashMap<String, String>>>,
    transactions: Arc<Mutex<HashMap<String, TransactionDetail>>>,
    // Fail the next N calls with a transient error
    transient_failures: Arc<Mutex<u32>>,
    // Fail the next N calls with a permanent error
    permanent_failures: Arc<Mutex<u32>>,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reference(&self, reference: &str, tx_hash: &str) {
        self.references
            .lock()
            .unwrap()
            .insert(reference.to_string(), tx_hash.to_string());
    }

    pub fn set_transaction(&self, detail: TransactionDetail) {
        self.transactions
            .lock()
            .unwrap()
            .insert(detail.tx_hash.clone(), detail);
    }

    pub fn fail_next_transient(&self, count: u32) {
        *self.transient_failures.lock().unwrap() = count;
    }

    pub fn fail_next_permanent(&self, count: u32) {
        *self.permanent_failures.lock().unwrap() = count;
    }

    fn maybe_fail(&self) -> Result<(), RpcError> {
        {
            let mut transient = self.transient_failures.lock().unwrap();
            if *transient > 0 {
                *transient -= 1;
                return Err(RpcError::Transient("mock transient failure".to_string()));
            }
        }
        let mut permanent = self.permanent_failures.lock().unwrap();
        if *permanent > 0 {
            *permanent -= 1;
            return Err(RpcError::Rpc {
                code: -32602,
                message: "mock permanent failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChainClientInner for MockChainClient {
    async fn find_transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<String>, RpcError> {
        self.maybe_fail()?;
        Ok(self.references.lock().unwrap().get(reference).cloned())
    }

    async fn get_transaction(&self, tx_hash: &str) -> Result<Option<TransactionDetail>, RpcError> {
        self.maybe_fail()?;
        Ok(self.transactions.lock().unwrap().get(tx_hash).cloned())
    }
}
