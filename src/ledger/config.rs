//! SDK-level connection option: a network fragment and a crypto-material fragment.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::LedgerError;

/// Files expected under the crypto-material root.
pub const CA_CERT: &str = "ca.crt";
pub const SDK_CERT: &str = "sdk.crt";
pub const SDK_KEY: &str = "sdk.key";

/// Target group (network partition). Groups are numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(u32);

impl GroupId {
    pub fn new(id: u32) -> Option<Self> {
        (id >= 1).then_some(Self(id))
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl FromStr for GroupId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        trimmed
            .parse::<u32>()
            .ok()
            .and_then(GroupId::new)
            .ok_or_else(|| format!("group id must be a positive integer, got '{trimmed}'"))
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One `host:port` node endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerEndpoint {
    pub host: String,
    pub port: u16,
}

impl FromStr for PeerEndpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("peer '{s}' is not in host:port form"))?;
        if host.is_empty() || host.chars().any(char::is_whitespace) {
            return Err(format!("peer '{s}' has an invalid host"));
        }
        let port: u16 = port
            .parse()
            .map_err(|_| format!("peer '{s}' has an invalid port"))?;
        if port == 0 {
            return Err(format!("peer '{s}' has port 0"));
        }
        Ok(Self { host: host.to_string(), port })
    }
}

impl fmt::Display for PeerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub peers: Vec<PeerEndpoint>,
}

#[derive(Debug, Clone)]
pub struct CryptoMaterialConfig {
    pub cert_path: PathBuf,
}

impl CryptoMaterialConfig {
    pub fn ca_cert(&self) -> PathBuf {
        self.cert_path.join(CA_CERT)
    }

    pub fn sdk_cert(&self) -> PathBuf {
        self.cert_path.join(SDK_CERT)
    }

    pub fn sdk_key(&self) -> PathBuf {
        self.cert_path.join(SDK_KEY)
    }

    /// The root must be a directory holding non-empty `ca.crt`, `sdk.crt` and `sdk.key`.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if !self.cert_path.is_dir() {
            return Err(LedgerError::InvalidConfig(format!(
                "certificate path {} is not a directory",
                self.cert_path.display()
            )));
        }
        for file in [self.ca_cert(), self.sdk_cert(), self.sdk_key()] {
            check_material_file(&file)?;
        }
        Ok(())
    }
}

fn check_material_file(path: &Path) -> Result<(), LedgerError> {
    let meta = fs::metadata(path).map_err(|e| {
        LedgerError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
    })?;
    if !meta.is_file() || meta.len() == 0 {
        return Err(LedgerError::InvalidConfig(format!(
            "{} is not usable certificate material",
            path.display()
        )));
    }
    Ok(())
}

/// Everything the SDK needs to reach the network.
#[derive(Debug, Clone)]
pub struct ConfigOption {
    pub network: NetworkConfig,
    pub crypto_material: CryptoMaterialConfig,
}

impl ConfigOption {
    pub fn new(network: NetworkConfig, crypto_material: CryptoMaterialConfig) -> Self {
        Self { network, crypto_material }
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.network.peers.is_empty() {
            return Err(LedgerError::InvalidConfig("network.peers is empty".into()));
        }
        self.crypto_material.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_material(dir: &Path) {
        for f in [CA_CERT, SDK_CERT, SDK_KEY] {
            fs::write(dir.join(f), "-----BEGIN TEST-----\n").unwrap();
        }
    }

    #[test]
    fn peer_parses_host_and_port() {
        let p: PeerEndpoint = "127.0.0.1:20200".parse().unwrap();
        assert_eq!(p.host, "127.0.0.1");
        assert_eq!(p.port, 20200);
        assert_eq!(p.to_string(), "127.0.0.1:20200");
    }

    #[test]
    fn malformed_peers_are_rejected() {
        for bad in ["127.0.0.1", ":20200", "node:abc", "node:0", "node:70000", "a b:1"] {
            assert!(bad.parse::<PeerEndpoint>().is_err(), "expected '{bad}' to fail");
        }
    }

    #[test]
    fn group_id_must_be_positive() {
        assert_eq!("1".parse::<GroupId>().unwrap().get(), 1);
        assert_eq!(" 7 ".parse::<GroupId>().unwrap().get(), 7);
        assert!("0".parse::<GroupId>().is_err());
        assert!("group".parse::<GroupId>().is_err());
        assert!("".parse::<GroupId>().is_err());
    }

    #[test]
    fn material_requires_all_three_files() {
        let tmp = TempDir::new().unwrap();
        let cfg = CryptoMaterialConfig { cert_path: tmp.path().to_path_buf() };
        assert!(cfg.validate().is_err());

        write_material(tmp.path());
        assert!(cfg.validate().is_ok());

        fs::write(tmp.path().join(SDK_KEY), "").unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("sdk.key"));
    }

    #[test]
    fn missing_directory_is_rejected() {
        let cfg = CryptoMaterialConfig { cert_path: PathBuf::from("/definitely/not/here") };
        assert!(matches!(cfg.validate(), Err(LedgerError::InvalidConfig(_))));
    }
}
