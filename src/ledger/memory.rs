//! In-process ledger: hosts groups, deploys governance contracts and answers
//! read-only calls without any network I/O.
//!
//! Contract addresses are `keccak256(creator ‖ nonce)[12..]`. Deploying a
//! governance contract also provisions its account manager, the way the
//! on-chain constructor does.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use sha3::{Digest, Keccak256};
use tracing::debug;

use super::abi;
use super::{ConfigOption, GroupId, LedgerError, SessionInfo};
use crate::address::Address;

#[derive(Debug, Clone)]
enum Contract {
    Governance {
        mode: u8,
        admins: Vec<Address>,
        account_manager: Address,
    },
    AccountManager {
        governance: Address,
    },
}

#[derive(Debug, Default)]
struct GroupState {
    block_number: u64,
    nonces: HashMap<Address, u64>,
    contracts: HashMap<Address, Contract>,
}

impl GroupState {
    fn next_contract_address(&mut self, creator: &Address) -> Address {
        let nonce = self.nonces.entry(*creator).or_insert(0);
        let mut hasher = Keccak256::new();
        hasher.update(creator.as_bytes());
        hasher.update(nonce.to_be_bytes());
        *nonce += 1;
        Address::from_digest(&hasher.finalize())
    }
}

#[derive(Debug, Default)]
struct State {
    groups: HashMap<GroupId, GroupState>,
    sessions_opened: u64,
    deployments: u64,
    calls: u64,
}

/// Shared in-process ledger. Clones see the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    state: Arc<Mutex<State>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(group: GroupId) -> Self {
        Self::with_groups(&[group])
    }

    pub fn with_groups(groups: &[GroupId]) -> Self {
        let ledger = Self::new();
        {
            let mut state = ledger.lock();
            for g in groups {
                state.groups.entry(*g).or_default();
            }
        }
        ledger
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means another holder panicked; the maps stay consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(super) fn open(
        &self,
        option: &ConfigOption,
        group: GroupId,
    ) -> Result<(MemorySession, SessionInfo), LedgerError> {
        let mut state = self.lock();
        let block_number = state
            .groups
            .get(&group)
            .map(|g| g.block_number)
            .ok_or(LedgerError::UnknownGroup(group))?;
        state.sessions_opened += 1;
        debug!(%group, peers = option.network.peers.len(), "memory ledger session opened");
        let session = MemorySession { ledger: self.clone(), group };
        let info = SessionInfo {
            endpoint: "memory".to_string(),
            block_number,
            client_version: Some(concat!("memory-ledger/", env!("CARGO_PKG_VERSION")).to_string()),
        };
        Ok((session, info))
    }

    /// Sessions opened so far.
    pub fn sessions_opened(&self) -> u64 {
        self.lock().sessions_opened
    }

    /// Contract-creation transactions accepted so far, across all groups.
    pub fn deployments(&self) -> u64 {
        self.lock().deployments
    }

    /// Read-only calls served so far, across all groups.
    pub fn calls(&self) -> u64 {
        self.lock().calls
    }

    /// Current block height of `group`, if hosted.
    pub fn block_number(&self, group: GroupId) -> Option<u64> {
        self.lock().groups.get(&group).map(|g| g.block_number)
    }

    /// Administrators recorded by a governance contract.
    pub fn governance_admins(&self, group: GroupId, governance: &Address) -> Option<Vec<Address>> {
        match self.lock().groups.get(&group)?.contracts.get(governance)? {
            Contract::Governance { admins, .. } => Some(admins.clone()),
            Contract::AccountManager { .. } => None,
        }
    }

    /// Governance mode recorded at deployment.
    pub fn governance_mode(&self, group: GroupId, governance: &Address) -> Option<u8> {
        match self.lock().groups.get(&group)?.contracts.get(governance)? {
            Contract::Governance { mode, .. } => Some(*mode),
            Contract::AccountManager { .. } => None,
        }
    }

    /// Whether `address` holds an account manager owned by `governance`.
    pub fn is_account_manager_of(&self, group: GroupId, address: &Address, governance: &Address) -> bool {
        matches!(
            self.lock().groups.get(&group).and_then(|g| g.contracts.get(address)),
            Some(Contract::AccountManager { governance: g }) if g == governance
        )
    }

    /// Overwrite the account-manager pointer of an existing governance
    /// contract (stands in for a governance vote that re-points it).
    pub fn set_account_manager(
        &self,
        group: GroupId,
        governance: &Address,
        account_manager: Address,
    ) -> Result<(), LedgerError> {
        let mut state = self.lock();
        let g = state.groups.get_mut(&group).ok_or(LedgerError::UnknownGroup(group))?;
        match g.contracts.get_mut(governance) {
            Some(Contract::Governance { account_manager: slot, .. }) => {
                *slot = account_manager;
                g.block_number += 1;
                Ok(())
            }
            _ => Err(LedgerError::Reverted(format!("{governance} is not a governance contract"))),
        }
    }

    /// Distinct contract addresses deployed in `group`.
    pub fn contracts(&self, group: GroupId) -> HashSet<Address> {
        self.lock()
            .groups
            .get(&group)
            .map(|g| g.contracts.keys().copied().collect())
            .unwrap_or_default()
    }
}

/// Session bound to one hosted group.
#[derive(Debug, Clone)]
pub struct MemorySession {
    ledger: MemoryLedger,
    group: GroupId,
}

impl MemorySession {
    pub(super) fn deploy_governance(&self, deployer: &Address, mode: u8) -> Result<Address, LedgerError> {
        let mut state = self.ledger.lock();
        let group = state
            .groups
            .get_mut(&self.group)
            .ok_or(LedgerError::UnknownGroup(self.group))?;

        let governance = group.next_contract_address(deployer);
        let account_manager = group.next_contract_address(&governance);
        group
            .contracts
            .insert(account_manager, Contract::AccountManager { governance });
        group.contracts.insert(
            governance,
            Contract::Governance { mode, admins: vec![*deployer], account_manager },
        );
        group.block_number += 1;
        state.deployments += 1;

        debug!(%governance, %account_manager, %deployer, "memory ledger deployed governance");
        Ok(governance)
    }

    pub(super) fn call(&self, _from: &Address, to: &Address, data: &[u8]) -> Result<Vec<u8>, LedgerError> {
        let mut state = self.ledger.lock();
        state.calls += 1;
        let group = state
            .groups
            .get(&self.group)
            .ok_or(LedgerError::UnknownGroup(self.group))?;

        // No code at the address: the call succeeds with empty output.
        let Some(contract) = group.contracts.get(to) else {
            return Ok(Vec::new());
        };
        if data.len() < 4 {
            return Err(LedgerError::Reverted("call data shorter than a selector".into()));
        }

        match contract {
            Contract::Governance { account_manager, .. }
                if data[..4] == abi::selector(abi::ACCOUNT_MANAGER_SIGNATURE) =>
            {
                Ok(abi::encode_address(account_manager).to_vec())
            }
            _ => Err(LedgerError::Reverted(format!(
                "{to} has no function 0x{}",
                hex::encode(&data[..4])
            ))),
        }
    }
}
