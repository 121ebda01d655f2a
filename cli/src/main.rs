//! canvas CLI - deploy, confirm and verify the Canvas registry from the terminal.
//!
//! Usage:
//! ```bash
//! # Deploy implementation + proxy, wait for 5 confirmations, verify on Snowtrace
//! CANVAS_RPC_URL=https://api.avax-test.network/ext/bc/C/rpc \
//! CANVAS_EXPLORER_API_URL=https://api-testnet.snowtrace.io/api \
//! canvas deploy --from 0x... \
//!     --implementation artifacts/contracts/Canvas.sol/Canvas.json \
//!     --proxy artifacts/ERC1967Proxy.json \
//!     --source verify/Canvas.json
//!
//! # Re-attach to a deployment that timed out
//! canvas wait --tx 0x...
//!
//! # Inspect a registry snapshot
//! canvas info --snapshot registry.json --name A
//! ```

mod config;
mod logging;
mod snapshot;

use std::env;
use std::fs;
use std::path::Path;
use std::process;

use anyhow::{bail, Context, Result};
use canvas_deploy::{
    CancellationToken, ConfirmationWaiter, ContractArtifact, DeploymentArtifacts,
    DeploymentPipeline, EtherscanClient, EvmChain, SourceMetadata, TxHash, Verifier,
};
use canvas_registry::{content_pointer, Address, NameRegistry, NAME, SYMBOL};
use canvas_rpc::HttpRpcClient;

use crate::config::{parse_flag, DeployEnv};
use crate::logging::{init_tracing, LogConfig};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let rest = &args[2..];
    let result = match args[1].as_str() {
        "deploy" => cmd_deploy(rest).await,
        "wait" => cmd_wait(rest).await,
        "verify" => cmd_verify(rest).await,
        "info" => cmd_info(rest),
        "register" => cmd_register(rest),
        "version" | "--version" | "-V" => {
            println!("canvas {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn print_usage() {
    println!("canvas {}", env!("CARGO_PKG_VERSION"));
    println!("Deploy and verify the Canvas name registry\n");
    println!("USAGE:");
    println!("    canvas <COMMAND> [FLAGS]\n");
    println!("COMMANDS:");
    println!("    deploy     Deploy implementation + proxy, wait, then verify");
    println!("    wait       Wait for confirmations of a submitted transaction");
    println!("    verify     Verify a deployed implementation's source");
    println!("    info       Show registry metadata or a snapshot's entries");
    println!("    register   Register a name in a registry snapshot file");
    println!("    version    Print version");
    println!("    help       Print this help\n");
    println!("COMMON FLAGS:");
    println!("    --rpc <URL>             JSON-RPC endpoint       [env: CANVAS_RPC_URL]");
    println!("    --confirmations <N>     Required depth (5)      [env: CANVAS_CONFIRMATIONS]");
    println!("    --explorer <URL>        Explorer API endpoint   [env: CANVAS_EXPLORER_API_URL]");
    println!("    --api-key <KEY>         Explorer API key        [env: CANVAS_EXPLORER_API_KEY]");
    println!("    --log-level <LEVEL>     trace|debug|info|warn|error");
    println!("    --log <CRATE=LEVEL>     Per-crate level override (repeatable)");
    println!("    --log-json              JSON log lines on stderr\n");
    println!("DEPLOY FLAGS:");
    println!("    --from <ADDR>           Node-managed deployer   [env: CANVAS_DEPLOYER]");
    println!("    --implementation <FILE> Registry artifact JSON  [required]");
    println!("    --proxy <FILE>          Proxy artifact JSON     [required]");
    println!("    --source <FILE>         Verification metadata   [required]\n");
    println!("WAIT FLAGS:");
    println!("    --tx <HASH>             Transaction to watch    [required]\n");
    println!("VERIFY FLAGS:");
    println!("    --address <ADDR>        Deployed address        [required]");
    println!("    --source <FILE>         Verification metadata   [required]");
    println!("    --proxy <ADDR>          Proxy to link once verified\n");
    println!("INFO / REGISTER FLAGS:");
    println!("    --snapshot <FILE>       Registry snapshot JSON");
    println!("    --name <NAME>           Name to look up or register");
    println!("    --owner <ADDR>          Owner of a new registration");
}

fn required(args: &[String], flag: &str) -> Result<String> {
    parse_flag(args, flag).with_context(|| format!("{flag} is required"))
}

fn read_file(path: &str) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {path}"))
}

fn load_artifact(path: &str) -> Result<ContractArtifact> {
    Ok(ContractArtifact::from_json(&read_file(path)?).with_context(|| format!("parsing {path}"))?)
}

fn load_source(path: &str) -> Result<SourceMetadata> {
    serde_json::from_str(&read_file(path)?).with_context(|| format!("parsing {path}"))
}

fn rpc(env: &DeployEnv) -> Result<HttpRpcClient> {
    HttpRpcClient::default_for(&env.rpc_url)
        .with_context(|| format!("connecting to {}", env.rpc_url))
}

/// A token cancelled on Ctrl-C. Only the local wait stops; submitted
/// transactions are unaffected.
fn ctrl_c_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, stopping");
            trigger.cancel();
        }
    });
    cancel
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn cmd_deploy(args: &[String]) -> Result<()> {
    init_tracing(&LogConfig::from_args(args));
    let env = DeployEnv::from_env(args)?;
    let from = env.require_deployer()?;

    let artifacts = DeploymentArtifacts {
        implementation: load_artifact(&required(args, "--implementation")?)?,
        proxy: load_artifact(&required(args, "--proxy")?)?,
        source: load_source(&required(args, "--source")?)?,
    };

    let pipeline = DeploymentPipeline::new(
        EvmChain::new(rpc(&env)?, from),
        EvmChain::new(rpc(&env)?, from),
        EtherscanClient::new(env.explorer())?,
        env.pipeline(),
    );

    tracing::info!(rpc = %env.rpc_url, %from, confirmations = env.confirmations, "deploying");
    let record = pipeline.run(&artifacts, &ctrl_c_token()).await?;
    print_json(&record)
}

async fn cmd_wait(args: &[String]) -> Result<()> {
    init_tracing(&LogConfig::from_args(args));
    let env = DeployEnv::from_env(args)?;
    let tx = TxHash::new(required(args, "--tx")?);

    // reads only; the sender address is never used
    let chain = EvmChain::new(rpc(&env)?, env.deployer.unwrap_or(Address::ZERO));
    let waiter = ConfirmationWaiter::new(chain, env.pipeline().waiter);
    let confirmation = waiter
        .await_confirmations(&tx, env.confirmations, &ctrl_c_token())
        .await?;
    print_json(&confirmation)
}

async fn cmd_verify(args: &[String]) -> Result<()> {
    init_tracing(&LogConfig::from_args(args));
    let env = DeployEnv::from_env(args)?;
    let address = parse_address(&required(args, "--address")?)?;
    let proxy = parse_flag(args, "--proxy").map(|raw| parse_address(&raw)).transpose()?;
    let source = load_source(&required(args, "--source")?)?;

    let verifier = Verifier::new(EtherscanClient::new(env.explorer())?);
    let result = verifier.verify(&address, &source).await?;
    print_json(&result)?;
    if !result.is_success() {
        bail!("verification of {address} failed");
    }

    if let Some(proxy) = proxy {
        let link = verifier.link_proxy(&proxy, &address).await?;
        print_json(&link)?;
        if !link.is_success() {
            bail!("linking proxy {proxy} to {address} failed");
        }
    }
    Ok(())
}

fn parse_address(raw: &str) -> Result<Address> {
    raw.parse().with_context(|| format!("invalid address {raw:?}"))
}

fn cmd_info(args: &[String]) -> Result<()> {
    let name = parse_flag(args, "--name");
    let Some(path) = parse_flag(args, "--snapshot") else {
        println!("Name:    {NAME}");
        println!("Symbol:  {SYMBOL}");
        if let Some(name) = name {
            println!("Pointer: {}", content_pointer(&name));
        }
        return Ok(());
    };

    let registry = snapshot::load(Path::new(&path))?;
    println!("Name:    {}", registry.display_name());
    println!("Symbol:  {}", registry.display_symbol());
    println!("Supply:  {}", registry.total_supply());

    match name {
        Some(name) => {
            let id = registry.identifier_of(&name)?;
            let entry = registry.entry(id)?;
            println!();
            println!("  #{:<6} {:<24} {}  owner {}", entry.id, entry.name, entry.content, entry.owner);
        }
        None => {
            println!();
            for entry in registry.entries() {
                println!("  #{:<6} {:<24} {}  owner {}", entry.id, entry.name, entry.content, entry.owner);
            }
        }
    }
    Ok(())
}

fn cmd_register(args: &[String]) -> Result<()> {
    init_tracing(&LogConfig::from_args(args));
    let path = required(args, "--snapshot")?;
    let name = required(args, "--name")?;
    let raw = required(args, "--owner")?;
    let owner: Address = raw.parse().with_context(|| format!("invalid owner {raw:?}"))?;

    let (id, registry) = snapshot::register(Path::new(&path), owner, &name)?;

    println!("Registered {name:?} as #{id} → {}", registry.resolve_content(id)?);
    Ok(())
}
