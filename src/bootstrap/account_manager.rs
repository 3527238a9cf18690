//! Account manager resolver: follows the governance contract's
//! `accountManager()` pointer and attaches to it.
//!
//! The address is fetched once per governance handle and cached. If governance
//! later re-points its account manager, handles resolved earlier keep the old
//! address; nothing here re-validates it.

use std::sync::Arc;

use tracing::{debug, info};

use crate::address::Address;
use crate::bootstrap::governance::GovernanceHandle;
use crate::bootstrap::identity::Identity;
use crate::error::AppError;
use crate::ledger::Client;

/// Handle to the account manager subordinate to a governance contract.
#[derive(Debug, Clone)]
pub struct AccountManagerHandle {
    address: Address,
    governance: Address,
    client: Client,
    identity: Arc<Identity>,
}

impl AccountManagerHandle {
    pub fn address(&self) -> Address {
        self.address
    }

    /// Governance contract the address was resolved from.
    pub fn governance(&self) -> Address {
        self.governance
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

pub async fn resolve_account_manager(
    governance: &GovernanceHandle,
    client: &Client,
    identity: Arc<Identity>,
) -> Result<AccountManagerHandle, AppError> {
    let address = *governance
        .account_manager
        .get_or_try_init(|| async {
            let address = governance.account_manager_address().await.map_err(|e| {
                AppError::Resolution(format!(
                    "governance {} accountManager(): {e}",
                    governance.address()
                ))
            })?;
            if address.is_zero() {
                return Err(AppError::Resolution(format!(
                    "governance {} has no account manager (zero address)",
                    governance.address()
                )));
            }
            info!(%address, governance = %governance.address(), "default account manager resolved");
            Ok::<_, AppError>(address)
        })
        .await?;

    debug!(%address, "attached account manager");
    Ok(AccountManagerHandle {
        address,
        governance: governance.address(),
        client: client.clone(),
        identity,
    })
}
