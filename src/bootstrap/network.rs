//! Network connector: node list parsing, connection option assembly and
//! session opening.
//!
//! Every configuration problem surfaces here as [`AppError::Config`], before
//! the first contract call.

use std::path::Path;

use tracing::info;

use crate::config::expand_home;
use crate::crypto::CryptoSuite;
use crate::error::AppError;
use crate::ledger::{
    Client, ConfigOption, CryptoMaterialConfig, GroupId, LedgerBackend, LedgerError, LedgerSdk,
    NetworkConfig, PeerEndpoint,
};

/// Split a `;`-delimited node list. Blank entries are skipped, so a blank
/// string yields an empty list.
pub fn parse_peers(node_str: &str) -> Vec<String> {
    node_str
        .split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Validate the inputs, assemble the option and open a session on `group_id`.
pub async fn connect(
    peers: &[String],
    cert_path: &Path,
    group_id: &str,
    suite: CryptoSuite,
    backend: LedgerBackend,
) -> Result<Client, AppError> {
    if peers.is_empty() {
        return Err(AppError::Config("node list is empty".into()));
    }
    let endpoints = peers
        .iter()
        .map(|p| p.parse::<PeerEndpoint>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(AppError::Config)?;
    let group: GroupId = group_id.parse().map_err(AppError::Config)?;

    let cert_path = expand_home(&cert_path.to_string_lossy());
    let option = ConfigOption::new(
        NetworkConfig { peers: endpoints },
        CryptoMaterialConfig { cert_path },
    );

    let sdk = LedgerSdk::new(option, backend).map_err(config_error)?;
    let client = sdk.client(group, suite).await.map_err(config_error)?;

    let session = client.session_info();
    info!(
        %group,
        endpoint = %session.endpoint,
        block_number = session.block_number,
        client_version = session.client_version.as_deref().unwrap_or("unknown"),
        "client connected"
    );
    Ok(client)
}

fn config_error(e: LedgerError) -> AppError {
    AppError::Config(e.to_string())
}
