//! Access to the contracts through an EVM node.
//!
//! Reads and writes go through two traits so the polling loop and the dashboard can be
//! driven by any backend; [`client::JsonRpcHttpClient`] is the one used in production.

use std::future::Future;

use alloy_sol_types::SolCall;
use anyhow::{anyhow, Result};

use crate::model::{Address, TxHash};

pub mod call;
pub mod client;
#[cfg(test)]
pub(crate) mod mock;

pub use call::{ContractCall, View};

/// Read-only contract queries (`eth_call`).
pub trait ContractReader: Send + Sync {
    /// Returns the raw ABI-encoded return data.
    fn call(&self, call: &ContractCall) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Calls a view and decodes what it returns.
    fn read<C>(&self, view: &View<C>) -> impl Future<Output = Result<C::Return>> + Send
    where
        Self: Sized,
        C: SolCall,
        C::Return: Send,
    {
        async move {
            let data = self.call(&view.call).await?;
            view.decode(&data)
                .map_err(|e| anyhow!("decoding {view} result: {e}"))
        }
    }
}

/// State changing transactions, signed by whoever controls `from` on the node side.
pub trait ContractWriter: Send + Sync {
    fn send(
        &self,
        from: Address,
        call: &ContractCall,
    ) -> impl Future<Output = Result<TxHash>> + Send;
}
