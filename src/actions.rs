//! User-triggered transactions: in-flight flags, outcome reporting.

use std::{
    future::Future,
    sync::atomic::{AtomicBool, Ordering},
};

use anyhow::Result;
use derive_more::Display;
use tracing::{info, warn};

use crate::model::TxHash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ActionKind {
    Approve,
    Mint,
    Redeem,
    NftApprove,
    NftMint,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::Approve,
        ActionKind::Mint,
        ActionKind::Redeem,
        ActionKind::NftApprove,
        ActionKind::NftMint,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn success_message(self) -> &'static str {
        match self {
            ActionKind::Approve => "Collateral approved",
            ActionKind::Mint => "Mint succeeded",
            ActionKind::Redeem => "Redeem succeeded",
            ActionKind::NftApprove => "NFT payment approved",
            ActionKind::NftMint => "NFT minted",
        }
    }

    pub fn failure_message(self) -> &'static str {
        match self {
            ActionKind::Approve => "Approval failed",
            ActionKind::Mint => "Mint failed",
            ActionKind::Redeem => "Redeem failed",
            ActionKind::NftApprove => "NFT approval failed",
            ActionKind::NftMint => "NFT mint failed",
        }
    }
}

/// One "in flight" flag per action. Advisory only: nothing stops a caller from starting
/// an action whose flag is already set.
#[derive(Debug, Default)]
pub struct ActionFlags {
    flags: [AtomicBool; 5],
}

impl ActionFlags {
    pub fn is_in_flight(&self, kind: ActionKind) -> bool {
        self.flags[kind.index()].load(Ordering::Acquire)
    }

    pub fn any_in_flight(&self) -> bool {
        ActionKind::ALL.iter().any(|k| self.is_in_flight(*k))
    }

    fn raise(&self, kind: ActionKind) -> FlagGuard<'_> {
        self.flags[kind.index()].store(true, Ordering::Release);
        FlagGuard { flags: self, kind }
    }
}

/// Lowers the flag when dropped, whichever way the action ended.
struct FlagGuard<'a> {
    flags: &'a ActionFlags,
    kind: ActionKind,
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.flags.flags[self.kind.index()].store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Level {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: ActionKind,
    pub level: Level,
    pub message: String,
    pub detail: Option<String>,
}

/// Where action results are reported. Fire and forget.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Reports through the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, n: Notification) {
        match n.level {
            Level::Success => info!(action = %n.kind, detail = ?n.detail, "{}", n.message),
            Level::Failure => warn!(action = %n.kind, detail = ?n.detail, "{}", n.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Succeeded(TxHash),
    Failed(String),
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Succeeded(_))
    }
}

/// Runs one action: raises its flag, awaits the submission, sends exactly one
/// notification, lowers the flag.
pub async fn run_action<F>(
    flags: &ActionFlags,
    notifier: &dyn Notifier,
    kind: ActionKind,
    submission: F,
) -> ActionOutcome
where
    F: Future<Output = Result<TxHash>>,
{
    let _guard = flags.raise(kind);
    info!("Starting {}", kind);

    match submission.await {
        Ok(tx_hash) => {
            notifier.notify(Notification {
                kind,
                level: Level::Success,
                message: kind.success_message().to_string(),
                detail: Some(tx_hash.to_string()),
            });
            ActionOutcome::Succeeded(tx_hash)
        }
        Err(e) => {
            let reason = format!("{:#}", e);
            notifier.notify(Notification {
                kind,
                level: Level::Failure,
                message: kind.failure_message().to_string(),
                detail: Some(reason.clone()),
            });
            ActionOutcome::Failed(reason)
        }
    }
}
