//! Ledger SDK collaborator: connection option, sessions and contract calls.
//!
//! `LedgerBackend` is an enum over concrete backends; `build(config, group)`
//! is the factory called at startup. Adding a backend = new module + new
//! variant + new arms in `open`, `deploy_governance` and `call`.
//!
//! Sessions are shared, cheap-to-clone handles. Their internal thread-safety
//! belongs to the backend.

pub mod abi;
pub mod config;
pub mod jsonrpc;
pub mod memory;

use std::sync::Arc;

use thiserror::Error;

use crate::address::Address;
use crate::config::{BackendKind, NetworkSettings};
use crate::crypto::CryptoSuite;

pub use config::{ConfigOption, CryptoMaterialConfig, GroupId, NetworkConfig, PeerEndpoint};

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid connection option: {0}")]
    InvalidConfig(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("group {0} is not served by any peer")]
    UnknownGroup(GroupId),
    #[error("call reverted: {0}")]
    Reverted(String),
    #[error("unsupported by this backend: {0}")]
    Unsupported(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

// ── Backend enum ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum LedgerBackend {
    Memory(memory::MemoryLedger),
    JsonRpc(jsonrpc::JsonRpcLedger),
}

impl LedgerBackend {
    /// Open a session scoped to `group`.
    pub async fn open(
        &self,
        option: &ConfigOption,
        group: GroupId,
    ) -> Result<(Session, SessionInfo), LedgerError> {
        match self {
            LedgerBackend::Memory(ledger) => {
                let (s, info) = ledger.open(option, group)?;
                Ok((Session::Memory(s), info))
            }
            LedgerBackend::JsonRpc(ledger) => {
                let (s, info) = ledger.open(option, group).await?;
                Ok((Session::JsonRpc(s), info))
            }
        }
    }
}

/// Construct the configured backend.
pub fn build(config: &NetworkSettings, group: GroupId) -> LedgerBackend {
    match config.backend {
        BackendKind::Memory => LedgerBackend::Memory(memory::MemoryLedger::with_group(group)),
        BackendKind::JsonRpc => LedgerBackend::JsonRpc(jsonrpc::JsonRpcLedger::new(config.scheme)),
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Session {
    Memory(memory::MemorySession),
    JsonRpc(jsonrpc::RpcSession),
}

/// What the session learned while opening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Peer the session is bound to (`memory` for the in-process ledger).
    pub endpoint: String,
    pub block_number: u64,
    pub client_version: Option<String>,
}

// ── SDK + client ──────────────────────────────────────────────────────────────

/// Validated connection option plus the backend that serves it.
#[derive(Debug, Clone)]
pub struct LedgerSdk {
    option: Arc<ConfigOption>,
    backend: LedgerBackend,
}

impl LedgerSdk {
    /// Validate `option` up front so configuration errors never wait for first use.
    pub fn new(option: ConfigOption, backend: LedgerBackend) -> Result<Self, LedgerError> {
        option.validate()?;
        Ok(Self { option: Arc::new(option), backend })
    }

    pub fn option(&self) -> &ConfigOption {
        &self.option
    }

    pub async fn client(&self, group: GroupId, suite: CryptoSuite) -> Result<Client, LedgerError> {
        let (session, info) = self.backend.open(&self.option, group).await?;
        Ok(Client { group, suite, info, option: Arc::clone(&self.option), session })
    }
}

/// Live session against one group.
#[derive(Debug, Clone)]
pub struct Client {
    group: GroupId,
    suite: CryptoSuite,
    info: SessionInfo,
    option: Arc<ConfigOption>,
    session: Session,
}

impl Client {
    pub fn group(&self) -> GroupId {
        self.group
    }

    pub fn crypto_suite(&self) -> CryptoSuite {
        self.suite
    }

    pub fn session_info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn option(&self) -> &ConfigOption {
        &self.option
    }

    /// Submit a governance contract-creation transaction from `deployer`.
    pub async fn deploy_governance(&self, deployer: &Address, mode: u8) -> Result<Address, LedgerError> {
        match &self.session {
            Session::Memory(s) => s.deploy_governance(deployer, mode),
            Session::JsonRpc(s) => s.deploy_governance(deployer, mode).await,
        }
    }

    /// Read-only call; returns the raw output bytes.
    pub async fn call(&self, from: &Address, to: &Address, data: &[u8]) -> Result<Vec<u8>, LedgerError> {
        match &self.session {
            Session::Memory(s) => s.call(from, to, data),
            Session::JsonRpc(s) => s.call(from, to, data).await,
        }
    }
}
