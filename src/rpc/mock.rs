//! In-memory chain used by unit tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Mutex,
    },
};

use alloy_sol_types::SolValue;
use anyhow::{anyhow, bail, Result};

use super::{ContractCall, ContractReader, ContractWriter};
use crate::model::{Address, TxHash, U256};

#[derive(Default)]
pub struct MockChain {
    values: Mutex<HashMap<(Address, Vec<u8>), U256>>,
    pub calls: Mutex<Vec<ContractCall>>,
    pub sent: Mutex<Vec<(Address, ContractCall)>>,
    pub fail_writes: AtomicBool,
    tx_count: AtomicU64,
}

impl MockChain {
    pub fn set(&self, call: impl AsRef<ContractCall>, value: U256) {
        let call = call.as_ref();
        self.values
            .lock()
            .unwrap()
            .insert((call.to, call.data.clone()), value);
    }

    pub fn set_u64(&self, call: impl AsRef<ContractCall>, value: u64) {
        self.set(call, U256::from(value));
    }

    /// Makes a view revert from now on.
    pub fn unset(&self, call: impl AsRef<ContractCall>) {
        let call = call.as_ref();
        self.values
            .lock()
            .unwrap()
            .remove(&(call.to, call.data.clone()));
    }

    pub fn call_count(&self, signature: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.signature == signature)
            .count()
    }

    pub fn sent_signatures(&self) -> Vec<&'static str> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, c)| c.signature)
            .collect()
    }
}

impl ContractReader for MockChain {
    async fn call(&self, call: &ContractCall) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(call.clone());
        let value = self
            .values
            .lock()
            .unwrap()
            .get(&(call.to, call.data.clone()))
            .copied()
            .ok_or_else(|| anyhow!("execution reverted: {call}"))?;
        Ok(value.abi_encode())
    }
}

impl ContractWriter for MockChain {
    async fn send(&self, from: Address, call: &ContractCall) -> Result<TxHash> {
        self.sent.lock().unwrap().push((from, call.clone()));
        if self.fail_writes.load(Ordering::Acquire) {
            bail!("user rejected the request");
        }
        let n = self.tx_count.fetch_add(1, Ordering::Relaxed);
        Ok(TxHash(format!("0x{:064x}", n + 1)))
    }
}
