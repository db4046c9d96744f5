//! Encoded contract calls, as sent to the node.

use std::{fmt, marker::PhantomData};

use alloy_sol_types::SolCall;

use crate::model::{address_hex, Address};

/// A call to one contract function, already ABI-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    /// Canonical signature, e.g. `balanceOf(address)`.
    pub signature: &'static str,
    pub data: Vec<u8>,
}

impl ContractCall {
    pub fn new<C: SolCall>(to: Address, call: &C) -> Self {
        Self {
            to,
            signature: C::SIGNATURE,
            data: call.abi_encode(),
        }
    }

    pub fn data_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.data))
    }
}

impl AsRef<ContractCall> for ContractCall {
    fn as_ref(&self) -> &ContractCall {
        self
    }
}

impl fmt::Display for ContractCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.signature, address_hex(&self.to))
    }
}

/// A read-only call whose return data decodes as `C::Return`.
pub struct View<C> {
    pub call: ContractCall,
    returns: PhantomData<fn() -> C>,
}

impl<C: SolCall> View<C> {
    pub fn new(to: Address, call: &C) -> Self {
        Self {
            call: ContractCall::new(to, call),
            returns: PhantomData,
        }
    }

    pub fn decode(&self, data: &[u8]) -> alloy_sol_types::Result<C::Return> {
        C::abi_decode_returns(data)
    }
}

impl<C> AsRef<ContractCall> for View<C> {
    fn as_ref(&self) -> &ContractCall {
        &self.call
    }
}

impl<C> fmt::Debug for View<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("View").field(&self.call).finish()
    }
}

impl<C> fmt::Display for View<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.call, f)
    }
}
