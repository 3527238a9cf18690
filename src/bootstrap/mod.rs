//! Bootstrap layer: builds the client, identity and governance handles, in order.
//!
//! - **network**: node list parsing and session opening.
//! - **identity**: key import or generation.
//! - **governance**: deploy or attach the governance contract.
//! - **account_manager**: resolve the governance contract's account manager.
//!
//! [`run`] connects first so a configuration failure never generates (or
//! logs) a key, and returns nothing partial: every step either succeeds or
//! the whole bootstrap fails.

pub mod account_manager;
pub mod governance;
pub mod identity;
pub mod network;

use std::sync::Arc;

use tracing::info;

use crate::config::SystemSettings;
use crate::error::AppError;
use crate::ledger::{Client, LedgerBackend};

use account_manager::{AccountManagerHandle, resolve_account_manager};
use governance::{GovernanceHandle, GovernanceTarget, bootstrap_governance};
use identity::{Identity, KeyDisclosure, resolve_identity};

/// Everything downstream code needs, built once at startup.
#[derive(Debug, Clone)]
pub struct Bootstrapped {
    pub client: Client,
    pub identity: Arc<Identity>,
    /// Present only when the key was generated this run.
    pub key_disclosure: Option<KeyDisclosure>,
    pub governance: GovernanceHandle,
    pub account_manager: AccountManagerHandle,
}

pub async fn run(settings: &SystemSettings, backend: LedgerBackend) -> Result<Bootstrapped, AppError> {
    // Checked before connecting: a malformed attach address must not cost a session.
    let target = GovernanceTarget::from_configured(settings.govern_contract_address.as_deref())?;

    let peers = network::parse_peers(&settings.node_str);
    let client = network::connect(
        &peers,
        &settings.config_path,
        &settings.group_id,
        settings.crypto_suite,
        backend,
    )
    .await?;

    let resolved = resolve_identity(settings.hex_private_key.as_deref(), client.crypto_suite())?;
    let identity = Arc::new(resolved.identity);
    info!(key_id = %identity.key_id, address = %identity.address(), "identity ready");

    let governance = bootstrap_governance(target, &client, Arc::clone(&identity)).await?;
    let account_manager =
        resolve_account_manager(&governance, &client, Arc::clone(&identity)).await?;

    Ok(Bootstrapped {
        client,
        identity,
        key_disclosure: resolved.disclosure,
        governance,
        account_manager,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::GroupId;
    use crate::ledger::config::{CA_CERT, SDK_CERT, SDK_KEY};
    use crate::ledger::memory::MemoryLedger;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn cert_dir() -> TempDir {
        let tmp = TempDir::new().unwrap();
        for f in [CA_CERT, SDK_CERT, SDK_KEY] {
            fs::write(tmp.path().join(f), "pem").unwrap();
        }
        tmp
    }

    fn ledger() -> MemoryLedger {
        MemoryLedger::with_group(GroupId::new(1).unwrap())
    }

    #[tokio::test]
    async fn fresh_run_generates_and_deploys() {
        let certs = cert_dir();
        let ledger = ledger();
        let settings = SystemSettings::test_default(certs.path());

        let out = run(&settings, LedgerBackend::Memory(ledger.clone())).await.unwrap();
        assert!(out.governance.deployed());
        assert_eq!(ledger.deployments(), 1);
        let disclosure = out.key_disclosure.expect("generated key must be disclosed");
        assert_eq!(disclosure.address, out.identity.address());
        assert!(ledger.is_account_manager_of(
            out.client.group(),
            &out.account_manager.address(),
            &out.governance.address()
        ));
    }

    #[tokio::test]
    async fn restart_with_recorded_values_reattaches() {
        let certs = cert_dir();
        let ledger = ledger();
        let mut settings = SystemSettings::test_default(certs.path());
        let first = run(&settings, LedgerBackend::Memory(ledger.clone())).await.unwrap();

        settings.hex_private_key = first.key_disclosure.map(|d| d.private_key_hex);
        settings.govern_contract_address = Some(first.governance.address().to_string());
        let second = run(&settings, LedgerBackend::Memory(ledger.clone())).await.unwrap();

        assert!(!second.governance.deployed());
        assert!(second.key_disclosure.is_none());
        assert_eq!(second.identity.address(), first.identity.address());
        assert_eq!(second.governance.address(), first.governance.address());
        assert_eq!(second.account_manager.address(), first.account_manager.address());
        assert_eq!(ledger.deployments(), 1);
    }

    #[tokio::test]
    async fn empty_nodes_abort_before_identity() {
        let ledger = ledger();
        let mut settings = SystemSettings::test_default(Path::new("/x"));
        settings.node_str = String::new();

        let err = run(&settings, LedgerBackend::Memory(ledger.clone())).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert_eq!(ledger.sessions_opened(), 0);
        assert_eq!(ledger.deployments(), 0);
    }

    #[tokio::test]
    async fn malformed_attach_address_fails_before_connecting() {
        let certs = cert_dir();
        let ledger = ledger();
        let mut settings = SystemSettings::test_default(certs.path());
        settings.govern_contract_address = Some("0xABC".into());

        let err = run(&settings, LedgerBackend::Memory(ledger.clone())).await.unwrap_err();
        assert!(matches!(err, AppError::Attach(_)));
        assert_eq!(ledger.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn bad_key_aborts_before_deploy() {
        let certs = cert_dir();
        let ledger = ledger();
        let mut settings = SystemSettings::test_default(certs.path());
        settings.hex_private_key = Some("not-hex".into());

        let err = run(&settings, LedgerBackend::Memory(ledger.clone())).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidKeyFormat(_)));
        assert_eq!(ledger.deployments(), 0);
    }
}
