//! Periodic refresh of the on-chain values the dashboard displays.
//!
//! A [`Poller`] owns its task: it starts with [`Poller::start`] and ends with
//! [`Poller::stop`] or when dropped. Each query is independent; a failing one keeps its
//! previous value and the others still refresh.

use std::{fmt::Display, sync::Arc, time::Duration};

use alloy_sol_types::SolCall;
use anyhow::{Context, Result};
use tokio::{
    sync::{watch, Notify},
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    contracts::Contracts,
    estimator::RedeemQuote,
    model::{units::parse_units, Address, GOF_DECIMALS, U256},
    rpc::{ContractReader, View},
    utils::logger::LogMe,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(4000);

/// Values typed by the user. The mint amount parameterizes `requiredCollateralForMint`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInputs {
    pub mint_amount: String,
    pub redeem_amount: String,
}

impl Default for UserInputs {
    fn default() -> Self {
        Self {
            mint_amount: "0".into(),
            redeem_amount: "0".into(),
        }
    }
}

/// What to query, on whose behalf.
#[derive(Debug, Clone, Copy)]
pub struct PollTargets {
    pub contracts: Contracts,
    /// The zero address when no account is connected.
    pub owner: Address,
}

/// Latest known values. `None` until the first successful read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub gof_balance: Option<U256>,
    pub collateral_balance: Option<U256>,
    pub required_collateral: Option<U256>,
    /// Mint amount (in wei) `required_collateral` was computed for.
    pub required_for: Option<U256>,
    pub allowance: Option<U256>,
    pub quote: RedeemQuote,
    pub nft_mint_price: Option<U256>,
    pub nft_allowance: Option<U256>,
    pub nft_balance: Option<U256>,
    /// Number of completed poll rounds.
    pub rounds: u64,
}

impl Snapshot {
    /// The required collateral, only if it was computed for `mint_amount_wei`.
    pub fn required_collateral_for(&self, mint_amount_wei: U256) -> Option<U256> {
        self.required_collateral
            .filter(|_| self.required_for == Some(mint_amount_wei))
    }
}

fn refresh(slot: &mut Option<U256>, view: impl Display, result: Result<U256>) {
    if let Ok(value) = result.log_warn(format!("Polling {view}")) {
        *slot = Some(value);
    }
}

async fn read_optional<R, C>(
    reader: &R,
    view: Option<View<C>>,
) -> Option<(View<C>, Result<U256>)>
where
    R: ContractReader,
    C: SolCall<Return = U256>,
{
    let view = view?;
    let result = reader.read(&view).await;
    Some((view, result))
}

/// Runs every query once, concurrently, and folds the results into `snapshot`.
pub async fn poll_once<R: ContractReader>(
    reader: &R,
    targets: &PollTargets,
    mint_amount: &str,
    snapshot: &mut Snapshot,
) {
    let c = &targets.contracts;
    let owner = targets.owner;
    // an unparseable mint amount is queried as zero
    let mint_wei = parse_units(mint_amount, GOF_DECIMALS).unwrap_or_default();

    // the cached requirement belongs to another amount
    if snapshot.required_for != Some(mint_wei) {
        snapshot.required_collateral = None;
        snapshot.required_for = Some(mint_wei);
    }

    let gof_balance = c.gof_balance(owner);
    let collateral_balance = c.collateral_balance(owner);
    let required = c.required_collateral(mint_wei);
    let allowance = c.allowance(owner);
    let gold_price = c.gold_price();
    let ratio = c.collateral_ratio_pct();
    let fee = c.redeem_fee_bps();

    let (
        r_gof,
        r_col,
        r_req,
        r_allow,
        r_price,
        r_ratio,
        r_fee,
        r_nft_price,
        r_nft_allow,
        r_nft_bal,
    ) = tokio::join!(
        reader.read(&gof_balance),
        reader.read(&collateral_balance),
        reader.read(&required),
        reader.read(&allowance),
        reader.read(&gold_price),
        reader.read(&ratio),
        reader.read(&fee),
        read_optional(reader, c.nft_mint_price()),
        read_optional(reader, c.nft_allowance(owner)),
        read_optional(reader, c.nft_balance(owner)),
    );

    refresh(&mut snapshot.gof_balance, &gof_balance, r_gof);
    refresh(&mut snapshot.collateral_balance, &collateral_balance, r_col);
    refresh(&mut snapshot.required_collateral, &required, r_req);
    refresh(&mut snapshot.allowance, &allowance, r_allow);
    refresh(&mut snapshot.quote.gold_price, &gold_price, r_price);
    refresh(&mut snapshot.quote.collateral_ratio_pct, &ratio, r_ratio);
    refresh(&mut snapshot.quote.redeem_fee_bps, &fee, r_fee);
    if let Some((view, result)) = r_nft_price {
        refresh(&mut snapshot.nft_mint_price, &view, result);
    }
    if let Some((view, result)) = r_nft_allow {
        refresh(&mut snapshot.nft_allowance, &view, result);
    }
    if let Some((view, result)) = r_nft_bal {
        refresh(&mut snapshot.nft_balance, &view, result);
    }

    snapshot.rounds += 1;
}

pub struct Poller {
    snapshot: watch::Receiver<Snapshot>,
    wake: Arc<Notify>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    /// Spawns the polling loop. The first round runs immediately, then every `period`.
    pub fn start<R>(
        reader: Arc<R>,
        targets: PollTargets,
        period: Duration,
        inputs: watch::Receiver<UserInputs>,
    ) -> Self
    where
        R: ContractReader + 'static,
    {
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::default());
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let wake = Arc::new(Notify::new());
        let woken = Arc::clone(&wake);

        info!("Starting poller, every {:?}", period);
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut snapshot = Snapshot::default();

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                    _ = woken.notified() => {}
                }

                let mint_amount = inputs.borrow().mint_amount.clone();
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = poll_once(reader.as_ref(), &targets, &mint_amount, &mut snapshot) => {}
                }

                debug!("Poll round {} done", snapshot.rounds);
                snapshot_tx.send_replace(snapshot.clone());
            }
            info!("Poller stopped");
        });

        Self {
            snapshot: snapshot_rx,
            wake,
            cancel,
            handle: Some(handle),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot.clone()
    }

    pub fn latest(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    /// Runs a round without waiting for the next tick, and returns once a round has
    /// completed after the request.
    pub async fn poll_now(&self) {
        let mut rx = self.snapshot.clone();
        let done = rx.borrow_and_update().rounds;
        self.wake.notify_one();
        loop {
            if rx.changed().await.is_err() || rx.borrow_and_update().rounds > done {
                break;
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancels the loop and waits for the task to end.
    pub async fn stop(mut self) -> Result<()> {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle.await.context("joining poller task")?;
        }
        Ok(())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        contracts::{IGof, INft},
        model::units::exp10,
        rpc::mock::MockChain,
    };

    fn targets() -> PollTargets {
        PollTargets {
            contracts: Contracts {
                gof: Address::repeat_byte(0x01),
                collateral: Address::repeat_byte(0x02),
                nft: None,
            },
            owner: Address::repeat_byte(0xaa),
        }
    }

    fn seeded_chain(t: &PollTargets) -> MockChain {
        let chain = MockChain::default();
        let c = &t.contracts;
        chain.set_u64(&c.gof_balance(t.owner), 5);
        chain.set_u64(&c.collateral_balance(t.owner), 6);
        chain.set_u64(&c.allowance(t.owner), 7);
        chain.set(&c.gold_price(), U256::from(2000u64) * exp10(18));
        chain.set_u64(&c.collateral_ratio_pct(), 80);
        chain.set_u64(&c.redeem_fee_bps(), 50);
        chain.set_u64(&c.required_collateral(U256::ZERO), 0);
        chain
    }

    async fn wait_rounds(rx: &mut watch::Receiver<Snapshot>, rounds: u64) -> Snapshot {
        loop {
            {
                let s = rx.borrow_and_update();
                if s.rounds >= rounds {
                    return s.clone();
                }
            }
            rx.changed().await.unwrap();
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_poll_once() {
        let t = targets();
        let chain = seeded_chain(&t);
        let mut snapshot = Snapshot::default();

        poll_once(&chain, &t, "0", &mut snapshot).await;

        assert_eq!(snapshot.gof_balance, Some(U256::from(5u64)));
        assert_eq!(snapshot.collateral_balance, Some(U256::from(6u64)));
        assert_eq!(snapshot.allowance, Some(U256::from(7u64)));
        assert_eq!(snapshot.required_collateral, Some(U256::ZERO));
        assert_eq!(snapshot.quote.collateral_ratio_pct, Some(U256::from(80u64)));
        assert!(snapshot.quote.is_complete());
        assert_eq!(snapshot.nft_mint_price, None);
        assert_eq!(snapshot.rounds, 1);
        assert_eq!(chain.call_count(INft::mintPriceCall::SIGNATURE), 0);
    }

    #[test_log::test(tokio::test)]
    async fn test_failed_query_keeps_previous_value() {
        let t = targets();
        let chain = seeded_chain(&t);
        let mut snapshot = Snapshot::default();
        poll_once(&chain, &t, "0", &mut snapshot).await;

        chain.unset(&t.contracts.gold_price());
        chain.set_u64(&t.contracts.collateral_ratio_pct(), 90);
        poll_once(&chain, &t, "0", &mut snapshot).await;

        assert_eq!(
            snapshot.quote.gold_price,
            Some(U256::from(2000u64) * exp10(18))
        );
        assert_eq!(snapshot.quote.collateral_ratio_pct, Some(U256::from(90u64)));
    }

    #[test_log::test(tokio::test)]
    async fn test_never_resolved_query_stays_none() {
        let t = targets();
        let chain = seeded_chain(&t);
        chain.unset(&t.contracts.allowance(t.owner));
        let mut snapshot = Snapshot::default();
        poll_once(&chain, &t, "0", &mut snapshot).await;
        assert_eq!(snapshot.allowance, None);
        assert_eq!(snapshot.gof_balance, Some(U256::from(5u64)));
    }

    #[test_log::test(tokio::test)]
    async fn test_new_mint_amount_discards_stale_requirement() {
        let t = targets();
        let chain = seeded_chain(&t);
        let mut snapshot = Snapshot::default();
        poll_once(&chain, &t, "0", &mut snapshot).await;
        assert_eq!(snapshot.required_collateral, Some(U256::ZERO));

        // no value on chain for 2 GOF yet: the old requirement must not survive
        poll_once(&chain, &t, "2", &mut snapshot).await;
        assert_eq!(snapshot.required_collateral, None);

        let two = U256::from(2u64) * exp10(18);
        chain.set_u64(&t.contracts.required_collateral(two), 3_200_000_000);
        poll_once(&chain, &t, "2", &mut snapshot).await;
        assert_eq!(
            snapshot.required_collateral,
            Some(U256::from(3_200_000_000u64))
        );
        assert_eq!(snapshot.required_for, Some(two));
    }

    #[test]
    fn test_required_collateral_is_tied_to_its_amount() {
        let one = exp10(18);
        let snapshot = Snapshot {
            required_collateral: Some(U256::from(1_600_000_000u64)),
            required_for: Some(one),
            ..Default::default()
        };
        assert_eq!(
            snapshot.required_collateral_for(one),
            Some(U256::from(1_600_000_000u64))
        );
        assert_eq!(snapshot.required_collateral_for(one * U256::from(100u64)), None);
        assert_eq!(Snapshot::default().required_collateral_for(U256::ZERO), None);
    }

    #[test_log::test(tokio::test)]
    async fn test_unparseable_mint_amount_queries_zero() {
        let t = targets();
        let chain = seeded_chain(&t);
        let mut snapshot = Snapshot::default();
        poll_once(&chain, &t, "abc", &mut snapshot).await;
        assert_eq!(snapshot.required_collateral, Some(U256::ZERO));
    }

    #[test_log::test(tokio::test)]
    async fn test_poller_lifecycle() {
        let t = targets();
        let chain = Arc::new(seeded_chain(&t));
        let (_inputs_tx, inputs_rx) = watch::channel(UserInputs::default());

        let poller = Poller::start(chain.clone(), t, Duration::from_millis(10), inputs_rx);
        let mut rx = poller.subscribe();
        let snapshot = wait_rounds(&mut rx, 3).await;
        assert_eq!(snapshot.gof_balance, Some(U256::from(5u64)));
        assert!(poller.is_running());

        poller.stop().await.unwrap();
        let calls = chain.call_count(IGof::getGoldPriceCall::SIGNATURE);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(chain.call_count(IGof::getGoldPriceCall::SIGNATURE), calls);
    }

    #[test_log::test(tokio::test)]
    async fn test_poller_follows_inputs() {
        let t = targets();
        let chain = Arc::new(seeded_chain(&t));
        let one = exp10(18);
        chain.set_u64(&t.contracts.required_collateral(one), 1_600_000_000);
        let (inputs_tx, inputs_rx) = watch::channel(UserInputs::default());

        let poller = Poller::start(chain.clone(), t, Duration::from_millis(10), inputs_rx);
        let mut rx = poller.subscribe();
        wait_rounds(&mut rx, 1).await;

        inputs_tx.send_modify(|i| i.mint_amount = "1".into());
        loop {
            rx.changed().await.unwrap();
            if rx.borrow().required_collateral == Some(U256::from(1_600_000_000u64)) {
                break;
            }
        }
        poller.stop().await.unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn test_poll_now_does_not_wait_for_the_tick() {
        let t = targets();
        let chain = Arc::new(seeded_chain(&t));
        let (_inputs_tx, inputs_rx) = watch::channel(UserInputs::default());

        let poller = Poller::start(chain.clone(), t, Duration::from_secs(3600), inputs_rx);
        let mut rx = poller.subscribe();
        wait_rounds(&mut rx, 1).await;

        chain.set_u64(&t.contracts.gof_balance(t.owner), 9);
        tokio::time::timeout(Duration::from_secs(5), poller.poll_now())
            .await
            .unwrap();
        let latest = poller.latest();
        assert_eq!(latest.rounds, 2);
        assert_eq!(latest.gof_balance, Some(U256::from(9u64)));
        poller.stop().await.unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn test_dropping_poller_stops_it() {
        let t = targets();
        let chain = Arc::new(seeded_chain(&t));
        let (_inputs_tx, inputs_rx) = watch::channel(UserInputs::default());

        let poller = Poller::start(chain.clone(), t, Duration::from_millis(10), inputs_rx);
        let mut rx = poller.subscribe();
        wait_rounds(&mut rx, 1).await;
        drop(poller);

        // the sender side goes away once the task has exited
        while rx.changed().await.is_ok() {}
        let calls = chain.call_count(IGof::redeemFeeBpsCall::SIGNATURE);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(chain.call_count(IGof::redeemFeeBpsCall::SIGNATURE), calls);
    }
}
