//! govacct-bootstrap: entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config)
//!   4. Init logger once
//!   5. Connect, resolve identity, deploy/attach governance, resolve account manager
//!   6. Print the resolved handles and exit

use tracing::info;

use govacct_bootstrap::bootstrap::{self, Bootstrapped};
use govacct_bootstrap::{config, error, ledger, logger};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), error::AppError> {
    // .env is optional.
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let config = config::load(args.config_path.as_deref())?;

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    logger::init(effective_log_level, args.log_level.is_some())?;

    info!(
        group_id = %config.system.group_id,
        config_path = %config.system.config_path.display(),
        backend = ?config.network.backend,
        crypto_suite = %config.system.crypto_suite,
        effective_log_level = %effective_log_level,
        "config loaded"
    );

    // The memory backend needs the group up front to host it.
    let group = config
        .system
        .group_id
        .parse()
        .map_err(error::AppError::Config)?;
    let backend = ledger::build(&config.network, group);

    let out = bootstrap::run(&config.system, backend).await?;
    print_summary(&out);
    Ok(())
}

fn print_summary(out: &Bootstrapped) {
    println!("✓ Governance bootstrap complete");
    println!("  group:           {}", out.client.group());
    println!("  endpoint:        {}", out.client.session_info().endpoint);
    println!("  identity:        {} ({})", out.identity.address(), out.identity.key_id);
    if let Some(disclosure) = &out.key_disclosure {
        println!("  generated key:   {}", disclosure.private_key_hex);
        println!("                   set GOVACCT_HEX_PRIVATE_KEY to keep this identity");
    }
    let how = if out.governance.deployed() { "created" } else { "loaded" };
    println!("  governance:      {} ({how})", out.governance.address_text());
    println!("  account manager: {}", out.account_manager.address());
}

struct CliArgs {
    log_level: Option<&'static str>,
    config_path: Option<String>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: govacct-bootstrap [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -v, -vv, -vvv, -vvvv       Set logging verbosity (warn, info, debug, trace)");
                std::process::exit(0);
            }
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    CliArgs { log_level: logger::level_for_verbosity(verbosity), config_path }
}
