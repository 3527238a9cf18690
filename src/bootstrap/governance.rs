//! Governance bootstrapper: deploy a new governance contract or attach to a
//! configured one.
//!
//! The choice is made once, from configuration, and never revisited. Attach
//! is lazy: an address that does not hold a governance contract only fails
//! when something calls it.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;

use crate::address::Address;
use crate::bootstrap::identity::Identity;
use crate::error::AppError;
use crate::ledger::{Client, LedgerError, abi};

/// Governance mode in which the deployer is the sole initial administrator.
pub const ADMIN_MODE: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GovernanceTarget {
    Deploy,
    /// `configured` is the address text exactly as given, surrounding
    /// whitespace removed.
    Attach { address: Address, configured: String },
}

impl GovernanceTarget {
    /// Blank or absent → `Deploy`; anything else must be a valid address.
    pub fn from_configured(address: Option<&str>) -> Result<Self, AppError> {
        match address.map(str::trim).filter(|a| !a.is_empty()) {
            None => Ok(GovernanceTarget::Deploy),
            Some(a) => a
                .parse::<Address>()
                .map(|address| GovernanceTarget::Attach { address, configured: a.to_string() })
                .map_err(|e| AppError::Attach(format!("configured governance address '{a}': {e}"))),
        }
    }
}

/// Handle to the governance contract this process operates under.
#[derive(Debug, Clone)]
pub struct GovernanceHandle {
    address: Address,
    address_text: String,
    deployed: bool,
    client: Client,
    identity: Arc<Identity>,
    pub(crate) account_manager: Arc<OnceCell<Address>>,
}

impl GovernanceHandle {
    pub fn address(&self) -> Address {
        self.address
    }

    /// The address as configured when attached, checksum casing included;
    /// the lowercase rendering when deployed.
    pub fn address_text(&self) -> &str {
        &self.address_text
    }

    /// `true` when this process created the contract, `false` when attached.
    pub fn deployed(&self) -> bool {
        self.deployed
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Read the contract's `accountManager()` accessor. Not cached.
    pub async fn account_manager_address(&self) -> Result<Address, LedgerError> {
        let data = abi::selector(abi::ACCOUNT_MANAGER_SIGNATURE);
        let output = self
            .client
            .call(&self.identity.address(), &self.address, &data)
            .await?;
        abi::decode_address(&output)
    }
}

/// Enter the DEPLOY or ATTACH state selected by `target`.
pub async fn bootstrap_governance(
    target: GovernanceTarget,
    client: &Client,
    identity: Arc<Identity>,
) -> Result<GovernanceHandle, AppError> {
    let (address, address_text, deployed) = match target {
        GovernanceTarget::Deploy => {
            let address = client
                .deploy_governance(&identity.address(), ADMIN_MODE)
                .await
                .map_err(|e| AppError::Deployment(e.to_string()))?;
            info!(%address, admin = %identity.address(), "default governance created");
            (address, address.to_string(), true)
        }
        GovernanceTarget::Attach { address, configured } => {
            info!(address = %configured, "default governance loaded");
            (address, configured, false)
        }
    };

    Ok(GovernanceHandle {
        address,
        address_text,
        deployed,
        client: client.clone(),
        identity,
        account_manager: Arc::new(OnceCell::new()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::identity::resolve_identity;
    use crate::crypto::CryptoSuite;
    use crate::ledger::memory::MemoryLedger;
    use crate::ledger::{
        ConfigOption, CryptoMaterialConfig, GroupId, LedgerBackend, LedgerSdk, NetworkConfig,
        PeerEndpoint,
    };
    use crate::ledger::config::{CA_CERT, SDK_CERT, SDK_KEY};
    use std::fs;
    use tempfile::TempDir;

    const ATTACH_ADDR: &str = "0xabc0000000000000000000000000000000000001";
    const ATTACH_ADDR_UPPER: &str = "0xABC0000000000000000000000000000000000001";

    async fn setup() -> (TempDir, MemoryLedger, Client, Arc<Identity>) {
        let tmp = TempDir::new().unwrap();
        for f in [CA_CERT, SDK_CERT, SDK_KEY] {
            fs::write(tmp.path().join(f), "pem").unwrap();
        }
        let group = GroupId::new(1).unwrap();
        let ledger = MemoryLedger::with_group(group);
        let option = ConfigOption::new(
            NetworkConfig { peers: vec![PeerEndpoint { host: "127.0.0.1".into(), port: 20200 }] },
            CryptoMaterialConfig { cert_path: tmp.path().to_path_buf() },
        );
        let sdk = LedgerSdk::new(option, LedgerBackend::Memory(ledger.clone())).unwrap();
        let client = sdk.client(group, CryptoSuite::Ecdsa).await.unwrap();
        let identity = resolve_identity(None, CryptoSuite::Ecdsa).unwrap().identity;
        (tmp, ledger, client, Arc::new(identity))
    }

    #[test]
    fn target_is_selected_by_address_presence() {
        assert_eq!(GovernanceTarget::from_configured(None).unwrap(), GovernanceTarget::Deploy);
        assert_eq!(GovernanceTarget::from_configured(Some("")).unwrap(), GovernanceTarget::Deploy);
        assert_eq!(GovernanceTarget::from_configured(Some("  ")).unwrap(), GovernanceTarget::Deploy);
        assert_eq!(
            GovernanceTarget::from_configured(Some(ATTACH_ADDR)).unwrap(),
            GovernanceTarget::Attach {
                address: ATTACH_ADDR.parse().unwrap(),
                configured: ATTACH_ADDR.to_string(),
            }
        );
    }

    #[test]
    fn malformed_address_is_attach_error() {
        let err = GovernanceTarget::from_configured(Some("0xABC")).unwrap_err();
        assert!(matches!(err, AppError::Attach(_)));
    }

    #[tokio::test]
    async fn deploy_creates_independent_instances() {
        let (_tmp, ledger, client, identity) = setup().await;
        let a = bootstrap_governance(GovernanceTarget::Deploy, &client, Arc::clone(&identity))
            .await
            .unwrap();
        let b = bootstrap_governance(GovernanceTarget::Deploy, &client, Arc::clone(&identity))
            .await
            .unwrap();
        assert_ne!(a.address(), b.address());
        assert!(a.deployed() && b.deployed());
        assert_eq!(ledger.deployments(), 2);
        assert_eq!(
            ledger.governance_admins(client.group(), &a.address()),
            Some(vec![identity.address()])
        );
        assert_eq!(ledger.governance_mode(client.group(), &a.address()), Some(ADMIN_MODE));
    }

    #[tokio::test]
    async fn attach_issues_no_transactions() {
        let (_tmp, ledger, client, identity) = setup().await;
        let target = GovernanceTarget::from_configured(Some(ATTACH_ADDR)).unwrap();
        let handle = bootstrap_governance(target, &client, identity).await.unwrap();
        assert_eq!(handle.address().to_string(), ATTACH_ADDR);
        assert_eq!(handle.address_text(), ATTACH_ADDR);
        assert!(!handle.deployed());
        assert_eq!(ledger.deployments(), 0);
        assert_eq!(ledger.calls(), 0);
    }

    #[tokio::test]
    async fn attach_keeps_configured_casing() {
        let (_tmp, _ledger, client, identity) = setup().await;
        let padded = format!("  {ATTACH_ADDR_UPPER} ");
        let target = GovernanceTarget::from_configured(Some(padded.as_str())).unwrap();
        let handle = bootstrap_governance(target, &client, identity).await.unwrap();
        assert_eq!(handle.address_text(), ATTACH_ADDR_UPPER);
        assert_eq!(handle.address(), ATTACH_ADDR_UPPER.parse::<Address>().unwrap());
        assert_eq!(handle.address(), ATTACH_ADDR.parse::<Address>().unwrap());
    }

    #[tokio::test]
    async fn deployed_address_text_is_lowercase_rendering() {
        let (_tmp, _ledger, client, identity) = setup().await;
        let handle = bootstrap_governance(GovernanceTarget::Deploy, &client, identity)
            .await
            .unwrap();
        assert_eq!(handle.address_text(), handle.address().to_string());
    }

    #[tokio::test]
    async fn accessor_reads_provisioned_account_manager() {
        let (_tmp, ledger, client, identity) = setup().await;
        let handle = bootstrap_governance(GovernanceTarget::Deploy, &client, identity)
            .await
            .unwrap();
        let am = handle.account_manager_address().await.unwrap();
        assert!(ledger.is_account_manager_of(client.group(), &am, &handle.address()));
    }
}
