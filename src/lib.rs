//! # GoldOracle client
//!
//! Mint and redeem the gold-pegged GOF token against its collateral, and mint the companion
//! NFT, by talking to the deployed contracts through an EVM JSON-RPC node.
//!
//! The [`dashboard::Dashboard`] keeps a [`poller::Poller`] refreshing the on-chain values,
//! derives the redeem estimate ([`estimator`]) and the action gates ([`gate`]), and submits
//! transactions on demand ([`actions`]).

pub mod actions;
pub mod contracts;
pub mod dashboard;
pub mod estimator;
pub mod gate;
pub mod model;
pub mod poller;
pub mod rpc;
pub mod utils;
