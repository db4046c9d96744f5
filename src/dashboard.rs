//! The user-facing state: typed inputs, polled values, what they mean, what can be done.

use std::{fmt, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use tokio::sync::watch;
use tracing::info;

use crate::{
    actions::{run_action, ActionFlags, ActionKind, ActionOutcome, Notifier},
    contracts::Contracts,
    estimator::format_estimate,
    gate::{can_mint, ActionAvailability},
    model::{
        units::{format_units, is_positive, parse_units},
        Address, NftItem, COLLATERAL_DECIMALS, GOF_DECIMALS, U256,
    },
    poller::{poll_once, PollTargets, Poller, Snapshot, UserInputs},
    rpc::{ContractCall, ContractReader, ContractWriter},
    utils::conf::SharedConf,
};

const EMPTY_BALANCE: &str = "0.00";

/// Formatted values ready to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardView {
    pub account: Option<Address>,
    pub gof_balance: String,
    pub collateral_balance: String,
    pub mint_amount: String,
    pub required_collateral: String,
    pub redeem_amount: String,
    pub redeem_estimate: String,
    pub gold_price: Option<String>,
    pub nft_mint_price: Option<String>,
    pub nft_owned: Option<String>,
    pub available: ActionAvailability,
    pub in_flight: Vec<ActionKind>,
}

/// Balances show `0.00` until known, and when zero.
fn balance(value: Option<U256>, decimals: u32, shown: u32) -> String {
    match value {
        Some(v) if !v.is_zero() => format_units(v, decimals, shown),
        _ => EMPTY_BALANCE.to_string(),
    }
}

pub struct Dashboard<C> {
    conf: SharedConf,
    chain: Arc<C>,
    notifier: Arc<dyn Notifier>,
    flags: Arc<ActionFlags>,
    inputs: watch::Sender<UserInputs>,
    poller: Option<Poller>,
    snapshot: Snapshot,
}

impl<C> Dashboard<C>
where
    C: ContractReader + ContractWriter + 'static,
{
    pub fn new(conf: SharedConf, chain: Arc<C>, notifier: Arc<dyn Notifier>) -> Self {
        let (inputs, _) = watch::channel(UserInputs::default());
        Self {
            conf,
            chain,
            notifier,
            flags: Arc::new(ActionFlags::default()),
            inputs,
            poller: None,
            snapshot: Snapshot::default(),
        }
    }

    pub fn contracts(&self) -> Contracts {
        self.conf.contracts()
    }

    fn targets(&self) -> PollTargets {
        PollTargets {
            contracts: self.contracts(),
            owner: self.conf.owner(),
        }
    }

    pub fn flags(&self) -> Arc<ActionFlags> {
        Arc::clone(&self.flags)
    }

    pub fn inputs(&self) -> UserInputs {
        self.inputs.borrow().clone()
    }

    pub fn set_mint_amount(&self, amount: impl Into<String>) {
        let amount = amount.into();
        self.inputs.send_modify(|i| i.mint_amount = amount);
    }

    pub fn set_redeem_amount(&self, amount: impl Into<String>) {
        let amount = amount.into();
        self.inputs.send_modify(|i| i.redeem_amount = amount);
    }

    pub fn gallery(&self) -> &[NftItem] {
        &self.conf.gallery
    }

    /// Starts background polling. Does nothing if already polling.
    pub fn mount(&mut self) {
        if self.poller.is_some() {
            return;
        }
        self.poller = Some(Poller::start(
            Arc::clone(&self.chain),
            self.targets(),
            self.conf.poll_interval(),
            self.inputs.subscribe(),
        ));
    }

    /// Stops background polling, keeping the last snapshot.
    pub async fn unmount(&mut self) -> Result<()> {
        if let Some(poller) = self.poller.take() {
            self.snapshot = poller.latest();
            poller.stop().await?;
        }
        Ok(())
    }

    pub fn is_mounted(&self) -> bool {
        self.poller.is_some()
    }

    /// Receives every new snapshot while mounted.
    pub fn subscribe(&self) -> Option<watch::Receiver<Snapshot>> {
        self.poller.as_ref().map(Poller::subscribe)
    }

    /// One poll round in the foreground. While mounted, the poller runs it and publishes
    /// the result.
    pub async fn refresh(&mut self) {
        if let Some(poller) = &self.poller {
            poller.poll_now().await;
            return;
        }
        let mint_amount = self.inputs.borrow().mint_amount.clone();
        let targets = self.targets();
        let mut snapshot = self.snapshot();
        poll_once(self.chain.as_ref(), &targets, &mint_amount, &mut snapshot).await;
        self.snapshot = snapshot;
    }

    pub fn snapshot(&self) -> Snapshot {
        match &self.poller {
            Some(poller) => poller.latest(),
            None => self.snapshot.clone(),
        }
    }

    /// The mint amount as queried by the poller; unparseable counts as zero.
    fn mint_amount_wei(inputs: &UserInputs) -> U256 {
        parse_units(&inputs.mint_amount, GOF_DECIMALS).unwrap_or_default()
    }

    /// Whether `kind` is allowed by the data alone, ignoring in-flight flags.
    fn gate_open(&self, kind: ActionKind, snapshot: &Snapshot, inputs: &UserInputs) -> bool {
        let connected = self.conf.is_connected();
        match kind {
            ActionKind::Approve => connected && is_positive(&inputs.mint_amount, GOF_DECIMALS),
            ActionKind::Mint => can_mint(
                snapshot.required_collateral_for(Self::mint_amount_wei(inputs)),
                snapshot.allowance,
            ),
            ActionKind::Redeem => connected && is_positive(&inputs.redeem_amount, GOF_DECIMALS),
            ActionKind::NftApprove => {
                connected && self.conf.nft_address.is_some() && snapshot.nft_mint_price.is_some()
            }
            ActionKind::NftMint => can_mint(snapshot.nft_mint_price, snapshot.nft_allowance),
        }
    }

    pub fn availability(&self) -> ActionAvailability {
        let snapshot = self.snapshot();
        let inputs = self.inputs();
        let open = |kind: ActionKind| {
            self.gate_open(kind, &snapshot, &inputs) && !self.flags.is_in_flight(kind)
        };
        ActionAvailability {
            approve: open(ActionKind::Approve),
            mint: open(ActionKind::Mint),
            redeem: open(ActionKind::Redeem),
            nft_approve: open(ActionKind::NftApprove),
            nft_mint: open(ActionKind::NftMint),
        }
    }

    pub fn redeem_estimate(&self) -> U256 {
        self.snapshot().quote.estimate(&self.inputs().redeem_amount)
    }

    pub fn view(&self) -> DashboardView {
        let snapshot = self.snapshot();
        let inputs = self.inputs();
        let nft_configured = self.conf.nft_address.is_some();

        DashboardView {
            account: self.conf.account,
            gof_balance: balance(snapshot.gof_balance, GOF_DECIMALS, 6),
            collateral_balance: balance(snapshot.collateral_balance, COLLATERAL_DECIMALS, 2),
            required_collateral: format_units(
                snapshot
                    .required_collateral_for(Self::mint_amount_wei(&inputs))
                    .unwrap_or_default(),
                COLLATERAL_DECIMALS,
                4,
            ),
            redeem_estimate: format_estimate(snapshot.quote.estimate(&inputs.redeem_amount)),
            gold_price: snapshot
                .quote
                .gold_price
                .map(|p| format_units(p, GOF_DECIMALS, 2)),
            nft_mint_price: snapshot
                .nft_mint_price
                .filter(|_| nft_configured)
                .map(|p| format_units(p, COLLATERAL_DECIMALS, 2)),
            nft_owned: snapshot
                .nft_balance
                .filter(|_| nft_configured)
                .map(|n| n.to_string()),
            available: self.availability(),
            in_flight: ActionKind::ALL
                .into_iter()
                .filter(|k| self.flags.is_in_flight(*k))
                .collect(),
            mint_amount: inputs.mint_amount,
            redeem_amount: inputs.redeem_amount,
        }
    }

    fn parse_amount(value: &str, what: &str) -> Result<U256> {
        parse_units(value, GOF_DECIMALS).ok_or_else(|| anyhow!("invalid {what} amount {value:?}"))
    }

    /// Builds the call for `kind` from the current inputs and snapshot.
    fn prepare(&self, kind: ActionKind) -> Result<ContractCall> {
        let snapshot = self.snapshot();
        let inputs = self.inputs();
        if !self.gate_open(kind, &snapshot, &inputs) {
            bail!("{kind} is not available right now");
        }

        let contracts = self.contracts();
        let nft_missing = || anyhow!("no NFT contract configured");
        match kind {
            ActionKind::Approve => {
                let required = snapshot
                    .required_collateral_for(Self::mint_amount_wei(&inputs))
                    .context("required collateral for this mint amount is not known yet")?;
                Ok(contracts.approve_collateral(required))
            }
            ActionKind::Mint => Ok(contracts
                .mint_with_collateral(Self::parse_amount(&inputs.mint_amount, "mint")?)),
            ActionKind::Redeem => {
                Ok(contracts.redeem(Self::parse_amount(&inputs.redeem_amount, "redeem")?))
            }
            ActionKind::NftApprove => contracts
                .nft_approve(snapshot.nft_mint_price.unwrap_or_default())
                .ok_or_else(nft_missing),
            ActionKind::NftMint => contracts.nft_mint().ok_or_else(nft_missing),
        }
    }

    /// Submits the transaction for `kind`. Always resolves; the outcome is also reported
    /// to the notifier.
    pub async fn perform(&self, kind: ActionKind) -> ActionOutcome {
        let prepared = self.prepare(kind);
        let account = self.conf.account;
        let outcome = run_action(&self.flags, self.notifier.as_ref(), kind, async {
            let from = account.context("no account connected")?;
            let call = prepared?;
            self.chain.send(from, &call).await
        })
        .await;
        info!("{} finished: {:?}", kind, outcome);
        outcome
    }

    pub async fn approve(&self) -> ActionOutcome {
        self.perform(ActionKind::Approve).await
    }

    pub async fn mint(&self) -> ActionOutcome {
        self.perform(ActionKind::Mint).await
    }

    pub async fn redeem(&self) -> ActionOutcome {
        self.perform(ActionKind::Redeem).await
    }

    pub async fn nft_approve(&self) -> ActionOutcome {
        self.perform(ActionKind::NftApprove).await
    }

    pub async fn nft_mint(&self) -> ActionOutcome {
        self.perform(ActionKind::NftMint).await
    }
}

impl fmt::Display for DashboardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let yes_no = |b: bool| if b { "yes" } else { "no" };
        match &self.account {
            Some(account) => writeln!(f, "Account            {}", account)?,
            None => writeln!(f, "Account            not connected")?,
        }
        writeln!(f, "GOF balance        {}", self.gof_balance)?;
        writeln!(f, "USDC balance       {}", self.collateral_balance)?;
        if let Some(price) = &self.gold_price {
            writeln!(f, "Gold price         {}", price)?;
        }
        writeln!(f, "Mint amount        {}", self.mint_amount)?;
        writeln!(f, "Required collat.   {} USDC", self.required_collateral)?;
        writeln!(
            f,
            "  approve: {}  mint: {}",
            yes_no(self.available.approve),
            yes_no(self.available.mint)
        )?;
        writeln!(f, "Redeem amount      {}", self.redeem_amount)?;
        writeln!(f, "You will receive ~ {} USDC", self.redeem_estimate)?;
        writeln!(f, "  redeem: {}", yes_no(self.available.redeem))?;
        if let Some(price) = &self.nft_mint_price {
            writeln!(f, "NFT mint price     {} USDC", price)?;
            writeln!(
                f,
                "  approve: {}  mint: {}",
                yes_no(self.available.nft_approve),
                yes_no(self.available.nft_mint)
            )?;
        }
        if let Some(owned) = &self.nft_owned {
            writeln!(f, "NFTs owned         {}", owned)?;
        }
        if !self.in_flight.is_empty() {
            let names: Vec<String> = self.in_flight.iter().map(|k| k.to_string()).collect();
            writeln!(f, "In flight          {}", names.join(", "))?;
        }
        Ok(())
    }
}
