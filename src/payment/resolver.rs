// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Reference resolution: locate the transaction that embedded a
//! client-generated reference key on the external ledger.

use crate::chain_client::ChainClientInner;
use crate::error::{ContestError, ContestResult};
use crate::retry_with_max_elapsed_time;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// How long one resolve attempt may keep retrying transient RPC errors
/// before degrading to "not found yet".
const RESOLVE_MAX_ELAPSED: Duration = Duration::from_secs(5);

pub struct ReferenceResolver {
    chain_client: Arc<dyn ChainClientInner>,
}

impl ReferenceResolver {
    pub fn new(chain_client: Arc<dyn ChainClientInner>) -> Self {
        Self { chain_client }
    }

    /// Returns the transaction hash that embedded `reference`, or None when
    /// it has not appeared on chain yet. Transient RPC failures also
    /// resolve to None: the caller's polling loop is the retry mechanism,
    /// and "try again later" is the honest answer either way.
    pub async fn resolve(&self, reference: &str) -> ContestResult<Option<String>> {
        if reference.is_empty() || bs58::decode(reference).into_vec().is_err() {
            return Err(ContestError::InvalidReference(reference.to_string()));
        }

        match retry_with_max_elapsed_time!(
            self.chain_client.find_transaction_by_reference(reference),
            RESOLVE_MAX_ELAPSED
        ) {
            Ok(Ok(found)) => Ok(found),
            Ok(Err(e)) | Err(e) => {
                if e.is_transient() {
                    warn!(
                        "[Resolver] Transient chain error for reference {}: {:?}",
                        reference, e
                    );
                    Ok(None)
                } else {
                    Err(ContestError::RpcError(e.to_string()))
                }
            }
        }
    }
}
