use std::{process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use goldoracle::{
    actions::{ActionKind, Level, Notification, Notifier, TracingNotifier},
    dashboard::Dashboard,
    estimator::format_estimate,
    rpc::client::JsonRpcHttpClient,
    utils::{
        conf::{Conf, ConfOverrides},
        logger::setup_tracing,
    },
};
use termion::color;
use tracing::info;

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, default_value = "goldoracle.ron")]
    pub config_file: String,

    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Account submitting transactions (0x-prefixed)
    #[arg(long)]
    pub account: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch everything once and print it
    Status {
        #[arg(long, default_value = "0")]
        mint: String,
        #[arg(long, default_value = "0")]
        redeem: String,
    },
    /// Keep polling and print every refresh, until Ctrl-C
    Watch {
        #[arg(long, default_value = "0")]
        mint: String,
        #[arg(long, default_value = "0")]
        redeem: String,
    },
    /// Collateral received for redeeming an amount of GOF
    Estimate {
        #[arg(long)]
        redeem: String,
    },
    /// Approve the collateral required to mint an amount of GOF
    Approve {
        #[arg(long)]
        mint: String,
    },
    /// Mint GOF against approved collateral
    Mint {
        #[arg(long)]
        mint: String,
    },
    /// Redeem GOF for collateral
    Redeem {
        #[arg(long)]
        redeem: String,
    },
    /// Approve the NFT mint price
    NftApprove,
    /// Mint an NFT
    NftMint,
    /// List the NFT gallery
    Gallery,
}

/// Prints outcomes in color, and logs them.
struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, n: Notification) {
        match n.level {
            Level::Success => print!("{}", color::Fg(color::Green)),
            Level::Failure => print!("{}", color::Fg(color::Red)),
        }
        match &n.detail {
            Some(detail) => println!("{} ({})", n.message, detail),
            None => println!("{}", n.message),
        }
        print!("{}", color::Fg(color::Reset));
        TracingNotifier.notify(n);
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let conf = Conf::new_shared(
        &args.config_file,
        ConfOverrides {
            rpc_url: args.rpc_url,
            account: args.account,
        },
    )
    .context("reading config file")?;

    setup_tracing(conf.log_format)?;
    info!("Using node {}", conf.rpc_url);

    let client = Arc::new(JsonRpcHttpClient::from_conf(&conf)?);
    let mut dashboard = Dashboard::new(conf.clone(), client, Arc::new(TerminalNotifier));

    let action = match args.command {
        Commands::Status { mint, redeem } => {
            dashboard.set_mint_amount(mint);
            dashboard.set_redeem_amount(redeem);
            dashboard.refresh().await;
            print!("{}", dashboard.view());
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Watch { mint, redeem } => {
            dashboard.set_mint_amount(mint);
            dashboard.set_redeem_amount(redeem);
            watch(&mut dashboard).await?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Estimate { redeem } => {
            dashboard.set_redeem_amount(redeem);
            dashboard.refresh().await;
            println!("{}", format_estimate(dashboard.redeem_estimate()));
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Gallery => {
            for item in dashboard.gallery() {
                println!("{}  {}", item, item.image_url);
                if !item.description.is_empty() {
                    println!("    {}", item.description);
                }
            }
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Approve { mint } => {
            dashboard.set_mint_amount(mint);
            ActionKind::Approve
        }
        Commands::Mint { mint } => {
            dashboard.set_mint_amount(mint);
            ActionKind::Mint
        }
        Commands::Redeem { redeem } => {
            dashboard.set_redeem_amount(redeem);
            ActionKind::Redeem
        }
        Commands::NftApprove => ActionKind::NftApprove,
        Commands::NftMint => ActionKind::NftMint,
    };

    // required amounts and allowances come from the chain
    dashboard.refresh().await;
    let outcome = dashboard.perform(action).await;

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn watch(dashboard: &mut Dashboard<JsonRpcHttpClient>) -> Result<()> {
    dashboard.mount();
    let mut snapshots = dashboard
        .subscribe()
        .context("poller should be running after mount")?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("{}", dashboard.view());
            }
            _ = &mut ctrl_c => {
                info!("Ctrl-C received, shutting down");
                break;
            }
        }
    }

    dashboard.unmount().await
}
