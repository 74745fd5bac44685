//! TOML-based configuration for sensormesh nodes.

use std::path::Path;

use serde::Deserialize;

use sensormesh_core::constants::SERIAL_SIZE;
use sensormesh_core::{NodeId, Serial};
use sensormesh_crypto::aead::PSK_SIZE;
use sensormesh_signing::{SignerConfig, Whitelist, WhitelistEntry};
use sensormesh_transport::TransportConfig;
use sensormesh_transport::constants::{
    FAILURE_COUNTER_MAX, PARENT_SEARCH_WINDOW_MS, STATE_RETRIES, STATE_TIMEOUT_MS,
    TIMEOUT_FAILURE_STATE, TRANSMISSION_FAILURES,
};

use crate::error::NodeError;

/// Top-level node configuration loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub node: NodeSection,
    #[serde(default)]
    pub transport: TransportSection,
    #[serde(default)]
    pub signing: SigningSection,
    #[serde(default)]
    pub encryption: EncryptionSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl NodeConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("failed to read config file: {e}")))?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, NodeError> {
        let config: Self =
            toml::from_str(s).map_err(|e| NodeError::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field that the TOML types alone cannot constrain.
    pub fn validate(&self) -> Result<(), NodeError> {
        self.transport_config()?;
        if self.signing.enabled {
            self.signing_secret()?;
            self.signing_serial()?;
            self.signer_config()?;
        }
        self.psk()?;
        Ok(())
    }

    pub fn transport_config(&self) -> Result<TransportConfig, NodeError> {
        let address = match self.node.address {
            None => NodeId::AUTO,
            Some(id) if id == 0 || id == NodeId::AUTO.get() => {
                return Err(NodeError::Config(format!(
                    "node.address must be between 1 and 254, got {id}"
                )));
            }
            Some(id) => NodeId(id),
        };
        let fixed_parent = match self.node.parent {
            Some(id) if id == NodeId::AUTO.get() => {
                return Err(NodeError::Config("node.parent cannot be 255".into()));
            }
            other => other.map(NodeId),
        };

        let t = &self.transport;
        if t.state_retries == 0 {
            return Err(NodeError::Config("transport.state_retries must be at least 1".into()));
        }
        if t.transmission_failure_threshold == 0
            || t.transmission_failure_threshold > FAILURE_COUNTER_MAX
        {
            return Err(NodeError::Config(format!(
                "transport.transmission_failure_threshold must be between 1 and {FAILURE_COUNTER_MAX}"
            )));
        }

        Ok(TransportConfig {
            address,
            fixed_parent,
            require_signatures: self.node.require_signatures,
            state_timeout_ms: t.state_timeout_ms,
            state_retries: t.state_retries,
            failure_backoff_ms: t.failure_backoff_ms,
            transmission_failure_threshold: t.transmission_failure_threshold,
            parent_search_window_ms: t.parent_search_window_ms,
        })
    }

    /// Signer settings, or `None` when signing is disabled.
    pub fn signer_config(&self) -> Result<Option<SignerConfig>, NodeError> {
        if !self.signing.enabled {
            return Ok(None);
        }
        let entries = self
            .signing
            .whitelist
            .iter()
            .map(|entry| {
                let serial = parse_hex::<SERIAL_SIZE>("signing.whitelist.serial", &entry.serial)?;
                Ok(WhitelistEntry {
                    node_id: NodeId(entry.node_id),
                    serial: Serial::new(serial),
                })
            })
            .collect::<Result<Vec<_>, NodeError>>()?;
        let whitelist = if entries.is_empty() {
            Whitelist::disabled()
        } else {
            Whitelist::enforced(entries)
        };

        Ok(Some(SignerConfig {
            verification_timeout_ms: self.signing.verification_timeout_ms,
            whitelist,
            salted_destinations: self
                .signing
                .salted_destinations
                .iter()
                .copied()
                .map(NodeId)
                .collect(),
        }))
    }

    /// HMAC secret provisioned into the software coprocessor.
    pub fn signing_secret(&self) -> Result<[u8; 32], NodeError> {
        let secret = self
            .signing
            .secret
            .as_deref()
            .ok_or_else(|| NodeError::Config("signing.secret is required when signing is enabled".into()))?;
        parse_hex("signing.secret", secret)
    }

    pub fn signing_serial(&self) -> Result<[u8; SERIAL_SIZE], NodeError> {
        let serial = self
            .signing
            .serial
            .as_deref()
            .ok_or_else(|| NodeError::Config("signing.serial is required when signing is enabled".into()))?;
        parse_hex("signing.serial", serial)
    }

    /// Radio pre-shared key; `None` leaves frames unencrypted.
    pub fn psk(&self) -> Result<Option<[u8; PSK_SIZE]>, NodeError> {
        self.encryption
            .psk
            .as_deref()
            .map(|psk| parse_hex("encryption.psk", psk))
            .transpose()
    }
}

/// Decode a hex string into exactly `N` bytes.
pub fn parse_hex<const N: usize>(field: &str, s: &str) -> Result<[u8; N], NodeError> {
    let bytes =
        hex::decode(s.trim()).map_err(|e| NodeError::Config(format!("{field}: invalid hex: {e}")))?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| NodeError::Config(format!("{field}: expected {N} bytes, got {len}")))
}

/// The `[node]` section.
#[derive(Debug, Default, Deserialize)]
pub struct NodeSection {
    /// Static node id. Omitted: requested from the gateway.
    pub address: Option<u8>,
    /// Fixed parent id. Omitted: discovered by broadcast.
    pub parent: Option<u8>,
    #[serde(default)]
    pub require_signatures: bool,
}

/// The `[transport]` section.
#[derive(Debug, Deserialize)]
pub struct TransportSection {
    #[serde(default = "default_state_timeout_ms")]
    pub state_timeout_ms: u32,
    #[serde(default = "default_state_retries")]
    pub state_retries: u8,
    #[serde(default = "default_failure_backoff_ms")]
    pub failure_backoff_ms: u32,
    #[serde(default = "default_transmission_failure_threshold")]
    pub transmission_failure_threshold: u8,
    #[serde(default = "default_parent_search_window_ms")]
    pub parent_search_window_ms: u32,
}

fn default_state_timeout_ms() -> u32 {
    STATE_TIMEOUT_MS
}

fn default_state_retries() -> u8 {
    STATE_RETRIES
}

fn default_failure_backoff_ms() -> u32 {
    TIMEOUT_FAILURE_STATE
}

fn default_transmission_failure_threshold() -> u8 {
    TRANSMISSION_FAILURES
}

fn default_parent_search_window_ms() -> u32 {
    PARENT_SEARCH_WINDOW_MS
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            state_timeout_ms: default_state_timeout_ms(),
            state_retries: default_state_retries(),
            failure_backoff_ms: default_failure_backoff_ms(),
            transmission_failure_threshold: default_transmission_failure_threshold(),
            parent_search_window_ms: default_parent_search_window_ms(),
        }
    }
}

/// The `[signing]` section.
#[derive(Debug, Deserialize)]
pub struct SigningSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_verification_timeout_ms")]
    pub verification_timeout_ms: u32,
    /// 32-byte HMAC secret, hex.
    pub secret: Option<String>,
    /// 9-byte device serial, hex.
    pub serial: Option<String>,
    #[serde(default)]
    pub whitelist: Vec<WhitelistSection>,
    #[serde(default)]
    pub salted_destinations: Vec<u8>,
}

fn default_verification_timeout_ms() -> u32 {
    sensormesh_signing::constants::VERIFICATION_TIMEOUT_MS
}

impl Default for SigningSection {
    fn default() -> Self {
        Self {
            enabled: false,
            verification_timeout_ms: default_verification_timeout_ms(),
            secret: None,
            serial: None,
            whitelist: Vec::new(),
            salted_destinations: Vec::new(),
        }
    }
}

/// A `[[signing.whitelist]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct WhitelistSection {
    pub node_id: u8,
    pub serial: String,
}

/// The `[encryption]` section.
#[derive(Debug, Default, Deserialize)]
pub struct EncryptionSection {
    /// 16-byte AES key, hex.
    pub psk: Option<String>,
}

/// The `[logging]` section.
#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
