//! Beeatm CLI - line-oriented driver over a simulated chain
//!
//! Every command prints one JSON value:
//!   connect                  → session snapshot
//!   deposit <amount>         → operation receipt
//!   withdraw <amount>        → operation receipt
//!   donate <amount> <id>     → operation receipt
//!   balance                  → balance snapshot (masked while hidden)
//!
//! Configuration:
//!   BEEATM_CONTRACT_ADDRESS, BEEATM_CATALOG (also read from .env)
//!
//! Output format:
//!   --json     Compact JSON (default for non-tty)
//!   --pretty   Pretty-print JSON (default for tty)

use anyhow::Context;
use beeatm::logging::init_logging;
use beeatm::sim::{SimulatedLedger, SimulatedWallet};
use beeatm::{shutdown_signal, to_smallest_unit, Atm, AtmConfig, AtmError, WalletProvider};
use serde_json::{json, Value};
use std::env;
use std::io::IsTerminal;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

#[tokio::main]
async fn main() {
    init_logging();

    let args: Vec<String> = env::args().collect();
    let opts = ParsedArgs::parse(&args[1..]);

    if opts.help {
        print_usage();
        return;
    }
    if opts.version {
        println!("beeatm {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let atm = match build_atm(&opts) {
        Ok(atm) => atm,
        Err(e) => {
            emit(&opts, &json!({"error": format!("{:#}", e)}), true);
            std::process::exit(1);
        }
    };

    let phase = atm.start().await;
    debug!(phase = %phase, "Session started");

    if let Err(e) = run_loop(&opts, &atm).await {
        emit(&opts, &json!({"error": format!("{:#}", e)}), true);
        std::process::exit(1);
    }
}

fn build_atm(opts: &ParsedArgs) -> anyhow::Result<Atm> {
    let config = AtmConfig::from_env().context("loading configuration")?;
    let initial = match &opts.initial_balance {
        Some(amount) => to_smallest_unit(amount).with_context(|| format!("--balance {}", amount))?,
        None => 0,
    };
    let ledger = SimulatedLedger::with_balance(initial).at(config.contract_address.clone());
    let provider: Option<Arc<dyn WalletProvider>> = if opts.no_wallet {
        None
    } else {
        let mut wallet = SimulatedWallet::new(ledger);
        if opts.reject {
            wallet = wallet.rejecting();
        }
        Some(Arc::new(wallet))
    };
    Ok(Atm::new(config, provider))
}

async fn run_loop(opts: &ParsedArgs, atm: &Atm) -> anyhow::Result<()> {
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            _ = &mut shutdown => break,
            line = lines.next_line() => line.context("reading stdin")?,
        };
        let Some(line) = line else { break };
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() || words[0].starts_with('#') {
            continue;
        }
        if matches!(words[0], "quit" | "exit") {
            break;
        }
        match dispatch(atm, &words).await {
            Ok(value) => emit(opts, &value, false),
            Err(e) => emit(opts, &error_json(&e), true),
        }
    }
    Ok(())
}

async fn dispatch(atm: &Atm, words: &[&str]) -> Result<Value, CommandError> {
    let arg = |i: usize| words.get(i).copied().ok_or(CommandError::Usage(words[0].to_string()));
    let campaign_id = |i: usize| -> Result<u32, CommandError> {
        let raw = arg(i)?;
        raw.parse().map_err(|_| CommandError::Usage(format!("campaign id {:?}", raw)))
    };

    let value = match words[0] {
        "help" => json!({"commands": COMMANDS}),
        "status" | "session" => to_json(&atm.session()),
        "connect" => {
            atm.connect().await?;
            to_json(&atm.session())
        }
        "sync" => {
            atm.sync_balance().await?;
            to_json(&atm.balance())
        }
        "balance" => to_json(&atm.balance()),
        "toggle" => {
            atm.toggle_balance_visibility();
            to_json(&atm.balance())
        }
        "deposit" => to_json(&atm.deposit(arg(1)?).await?),
        "withdraw" => to_json(&atm.withdraw(arg(1)?).await?),
        "donate" => to_json(&atm.donate(arg(1)?, campaign_id(2)?).await?),
        "campaigns" => to_json(&atm.catalog().all()),
        "campaign" => {
            let id = campaign_id(1)?;
            let info = atm.campaign_info(id).ok_or(AtmError::InvalidCampaign(id))?;
            json!({"info": info, "donated": atm.donated_to(id).to_string()})
        }
        "donations" => match words.get(1) {
            Some(_) => to_json(&atm.donations_for(campaign_id(1)?)),
            None => to_json(&atm.donations()),
        },
        "notifications" => to_json(&atm.notifications()),
        "clear" => {
            atm.clear_notifications();
            json!({"cleared": true})
        }
        "snapshot" => to_json(&atm.snapshot()),
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(value)
}

const COMMANDS: &[&str] = &[
    "help", "status", "connect", "sync", "balance", "toggle",
    "deposit <amount>", "withdraw <amount>", "donate <amount> <campaign>",
    "campaigns", "campaign <id>", "donations [campaign]",
    "notifications", "clear", "snapshot", "quit",
];

#[derive(Debug, thiserror::Error)]
enum CommandError {
    #[error(transparent)]
    Atm(#[from] AtmError),
    #[error("missing or bad argument for {0}")]
    Usage(String),
    #[error("unknown command: {0}")]
    Unknown(String),
}

fn error_json(e: &CommandError) -> Value {
    let kind = match e {
        CommandError::Atm(inner) if inner.is_validation() => "validation",
        CommandError::Atm(inner) if inner.is_ledger_failure() => "ledger",
        CommandError::Atm(_) => "session",
        CommandError::Usage(_) | CommandError::Unknown(_) => "usage",
    };
    json!({"error": e.to_string(), "kind": kind})
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| json!({"error": format!("serialize: {}", e)}))
}

fn emit(opts: &ParsedArgs, value: &Value, to_stderr: bool) {
    let pretty = opts.pretty || (!opts.json && std::io::stdout().is_terminal());
    let text = if pretty { serde_json::to_string_pretty(value) } else { serde_json::to_string(value) }
        .unwrap_or_else(|_| value.to_string());
    if to_stderr {
        eprintln!("{}", text);
    } else {
        println!("{}", text);
    }
}

#[derive(Default)]
struct ParsedArgs {
    initial_balance: Option<String>,
    no_wallet: bool,
    reject: bool,
    json: bool,
    pretty: bool,
    help: bool,
    version: bool,
}

impl ParsedArgs {
    fn parse(args: &[String]) -> Self {
        load_dotenv();

        let mut opts = ParsedArgs::default();
        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--help" | "-h" => opts.help = true,
                "--version" | "-V" => opts.version = true,
                "--json" => opts.json = true,
                "--pretty" => opts.pretty = true,
                "--no-wallet" => opts.no_wallet = true,
                "--reject" => opts.reject = true,
                "--balance" | "-b" => {
                    if i + 1 < args.len() {
                        opts.initial_balance = Some(args[i + 1].clone());
                        i += 1;
                    }
                }
                _ => {} // Ignore unknown flags
            }
            i += 1;
        }

        if opts.initial_balance.is_none() {
            opts.initial_balance = env::var("BEEATM_INITIAL_BALANCE").ok().filter(|s| !s.is_empty());
        }
        opts
    }
}

/// Variables already set in the environment win over `.env`.
fn load_dotenv() {
    let Ok(contents) = std::fs::read_to_string(".env") else { return };
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"');
            if !value.is_empty() && env::var(key.trim()).is_err() {
                env::set_var(key.trim(), value);
            }
        }
    }
}

fn print_usage() {
    println!(
        r#"beeatm - donation ATM over a simulated chain

USAGE:
    beeatm [options] < commands

COMMANDS (one per line on stdin):
    help                        List commands
    status                      Session state (alias: session)
    connect                     Connect wallet and bind the contract
    sync                        Refresh balance from the contract
    balance                     Show cached balance
    toggle                      Hide/show balance
    deposit <amount>            Deposit, e.g. `deposit 1.5`
    withdraw <amount>           Withdraw
    donate <amount> <id>        Donate to a campaign (minimum 1 ETH)
    campaigns                   List campaigns
    campaign <id>               Campaign info and local donation total
    donations [id]              Donation history, optionally for one campaign
    notifications               Notification log
    clear                       Clear notifications
    snapshot                    Full state
    quit                        Exit

OPTIONS:
    --balance, -b <amount>      Initial simulated contract balance (env: BEEATM_INITIAL_BALANCE)
    --no-wallet                 Start without a wallet provider
    --reject                    Wallet rejects account requests
    --json                      Compact JSON output
    --pretty                    Pretty JSON output
    --help, -h                  Show this help
    --version, -V               Show version

ENVIRONMENT:
    BEEATM_CONTRACT_ADDRESS     Contract address (default 0x5FbDB2315678afecb367f032d93F642f64180aa3)
    BEEATM_CATALOG              JSON campaign list [{{"id","name","goal","description"}}]
    BEEATM_LOG_JSON=1           JSON logs on stderr
    RUST_LOG                    Log filter (default info)"#
    );
}
