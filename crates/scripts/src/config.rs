//! Deployment configuration and chain credentials.
//!
//! Per-deployment values (oracle, requester contract, amounts) live in a TOML configuration
//! record. The RPC endpoint and the signing key come from the environment, usually through a
//! `.env` file.

use crate::callback::{CallbackWait, DEFAULT_CALLBACK_TIMEOUT, DEFAULT_POLL_INTERVAL};
use alloy::{
    primitives::{hex, utils::parse_ether, Address, B256, U256},
    signers::local::LocalSigner,
};
use eyre::eyre;
use k256::ecdsa::SigningKey;
use serde::Deserialize;
use std::{fs, path::Path, time::Duration};
use url::Url;

/// Default location of the configuration record.
pub const DEFAULT_CONFIG_PATH: &str = "qrng.toml";

const ENV_PROVIDER_URL: &str = "PROVIDER_URL";
const ENV_PRIVATE_KEY: &str = "PRIVATE_KEY";

type K256LocalSigner = LocalSigner<SigningKey>;

/// Errors from reading the environment
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// rpc url was not set
    #[error("environment variable {} must be set", ENV_PROVIDER_URL)]
    ProviderUrlNotSet,
    /// rpc url could not be parsed
    #[error("invalid {}: {0}", ENV_PROVIDER_URL)]
    InvalidProviderUrl(#[from] url::ParseError),
    /// private key was not set
    #[error("environment variable {} must be set", ENV_PRIVATE_KEY)]
    PrivateKeyNotSet,
    /// private key was not valid hex
    #[error("private key was not valid hex")]
    InvalidPrivateKeyHex(#[from] hex::FromHexError),
    /// private key hex was too short
    #[error("private key hex was too short")]
    ShortPrivateKeyHex,
    /// invalid private key
    #[error("invalid private key: {0}")]
    Ecdsa(#[from] k256::ecdsa::Error),
    /// funding amount is not a decimal ether value
    #[error("invalid funding amount {amount:?}: {reason}")]
    InvalidAmount {
        /// Amount as written in the config.
        amount: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Configuration record for one requester deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct QrngConfig {
    /// Oracle (Airnode) parameters.
    pub oracle: OracleConfig,
    /// Deployed requester contract.
    pub requester: RequesterConfig,
    /// Sponsor wallet funding.
    #[serde(default)]
    pub funding: FundingConfig,
    /// Random number requests.
    #[serde(default)]
    pub request: RequestConfig,
}

/// Oracle (Airnode) parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    /// Airnode address.
    pub airnode: Address,
    /// Extended public key of the airnode's `m/44'/60'/0'` node.
    pub xpub: String,
    /// Endpoint id of the `uint256[]` endpoint.
    pub endpoint_id: B256,
    /// Sponsor wallet. Derived from `xpub` when absent.
    #[serde(default)]
    pub sponsor_wallet: Option<Address>,
}

/// Deployed requester contract.
#[derive(Debug, Clone, Deserialize)]
pub struct RequesterConfig {
    /// Contract address. This is also the sponsor of the requests.
    pub address: Address,
    /// Confirmations to wait for before a transaction counts as included.
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
}

/// Sponsor wallet funding.
#[derive(Debug, Clone, Deserialize)]
pub struct FundingConfig {
    /// Amount of native currency to send, in ether.
    pub amount: String,
}

impl Default for FundingConfig {
    fn default() -> Self {
        Self { amount: "0.1".to_string() }
    }
}

/// Random number requests.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestConfig {
    /// How many random numbers to request.
    #[serde(default = "default_count")]
    pub count: u64,
    /// Seconds to wait for the callback.
    #[serde(default = "default_callback_timeout_secs")]
    pub callback_timeout_secs: u64,
    /// Milliseconds between two log polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
            callback_timeout_secs: default_callback_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl RequestConfig {
    /// Callback wait settings.
    pub const fn callback_wait(&self) -> CallbackWait {
        CallbackWait {
            timeout: Duration::from_secs(self.callback_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

const fn default_confirmations() -> u64 {
    1
}

const fn default_count() -> u64 {
    3
}

const fn default_callback_timeout_secs() -> u64 {
    DEFAULT_CALLBACK_TIMEOUT.as_secs()
}

const fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

impl QrngConfig {
    /// Load a [`QrngConfig`] from a specified path.
    pub fn from_path(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| eyre!("failed to read configuration {}: {e}", path.display()))?;
        Self::from_toml(&raw)
    }

    /// Parse a [`QrngConfig`] from TOML.
    pub fn from_toml(raw: &str) -> eyre::Result<Self> {
        toml::from_str(raw).map_err(|e| eyre!("failed to parse TOML: {e}"))
    }

    /// The sponsor wallet of the requester, either configured or derived from the oracle xpub.
    pub fn sponsor_wallet(&self) -> Result<Address, qrng_sponsor::Error> {
        match self.oracle.sponsor_wallet {
            Some(wallet) => Ok(wallet),
            None => qrng_sponsor::derive_sponsor_wallet(
                &self.oracle.xpub,
                self.oracle.airnode,
                self.requester.address,
            ),
        }
    }
}

/// Parse a decimal ether amount into wei.
pub fn parse_amount(amount: &str) -> Result<U256, Error> {
    parse_ether(amount.trim())
        .map_err(|e| Error::InvalidAmount { amount: amount.to_string(), reason: e.to_string() })
}

/// Connection settings read from the environment.
#[derive(Debug)]
pub struct ChainEnv {
    /// HTTP JSON-RPC endpoint.
    pub rpc_url: Url,
    /// Transaction signer.
    pub signer: K256LocalSigner,
}

impl ChainEnv {
    /// Read `PROVIDER_URL` and `PRIVATE_KEY`, loading `.env` first if present.
    pub fn from_env() -> Result<Self, Error> {
        dotenvy::dotenv().ok();

        let rpc_url = std::env::var(ENV_PROVIDER_URL).map_err(|_| Error::ProviderUrlNotSet)?;
        let secret = std::env::var(ENV_PRIVATE_KEY).map_err(|_| Error::PrivateKeyNotSet)?;

        Ok(Self { rpc_url: rpc_url.trim().parse()?, signer: signer_from_hex(&secret)? })
    }
}

fn signer_from_hex(secret: &str) -> Result<K256LocalSigner, Error> {
    let secret = secret.trim();
    let secret = secret.strip_prefix("0x").unwrap_or(secret);
    if secret.len() < 64 {
        return Err(Error::ShortPrivateKeyHex);
    }

    let decoded = hex::decode(secret)?;
    K256LocalSigner::from_slice(&decoded).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, b256};

    const CONFIG: &str = r#"
[oracle]
airnode = "0x4D1AbD47AdaFc2073B6e7E074C411075C0a80B9D"
xpub = "xpub6CpU7QoFYgVu25ki5SEcGHgFFwL3SWzBnTXMoCrUVdfazmEyrJZMzgkSYUGDqypJU6k2vXz3vdwmzncouWqWd7tK3iJqg45gVBV77Z2QGXG"
endpoint_id = "0x6db9e3e3d073ad12b66d28dd85bcf49f58577270b1cc2d48a43c7025f5c27af6"
sponsor_wallet = "0x6fDf1e43519ec7D7B9a6788f735a267CDe00EA92"

[requester]
address = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"
"#;

    // First anvil dev account.
    const ANVIL_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn parses_record_with_defaults() {
        let config = QrngConfig::from_toml(CONFIG).unwrap();

        assert_eq!(config.oracle.airnode, address!("0x4D1AbD47AdaFc2073B6e7E074C411075C0a80B9D"));
        assert_eq!(
            config.oracle.endpoint_id,
            b256!("0x6db9e3e3d073ad12b66d28dd85bcf49f58577270b1cc2d48a43c7025f5c27af6")
        );
        assert_eq!(config.requester.address, address!("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"));
        assert_eq!(config.requester.confirmations, 1);
        assert_eq!(config.funding.amount, "0.1");
        assert_eq!(config.request.count, 3);
        assert_eq!(config.request.callback_wait().timeout, DEFAULT_CALLBACK_TIMEOUT);
        assert_eq!(config.request.callback_wait().poll_interval, DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn configured_sponsor_wallet_wins() {
        let config = QrngConfig::from_toml(CONFIG).unwrap();
        assert_eq!(
            config.sponsor_wallet().unwrap(),
            address!("0x6fDf1e43519ec7D7B9a6788f735a267CDe00EA92")
        );
    }

    #[test]
    fn explicit_sections_override_defaults() {
        let raw = format!(
            "{CONFIG}\n[funding]\namount = \"0.25\"\n\n[request]\ncount = 5\ncallback_timeout_secs = 10\npoll_interval_ms = 250\n"
        );
        let config = QrngConfig::from_toml(&raw).unwrap();

        assert_eq!(config.funding.amount, "0.25");
        assert_eq!(config.request.count, 5);
        assert_eq!(config.request.callback_wait().timeout, Duration::from_secs(10));
        assert_eq!(config.request.callback_wait().poll_interval, Duration::from_millis(250));
    }

    #[test]
    fn missing_oracle_section_is_an_error() {
        let err = QrngConfig::from_toml("[requester]\naddress = \"0x0000000000000000000000000000000000000001\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("failed to parse TOML"));
    }

    #[test]
    fn config_file_is_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qrng.toml");
        fs::write(&path, CONFIG).unwrap();

        let config = QrngConfig::from_path(&path).unwrap();
        assert_eq!(config.requester.address, address!("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"));

        assert!(QrngConfig::from_path(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn amount_is_parsed_as_ether() {
        assert_eq!(parse_amount("0.1").unwrap(), U256::from(100_000_000_000_000_000u64));
        assert_eq!(parse_amount("1").unwrap(), U256::from(1_000_000_000_000_000_000u64));
        assert!(matches!(parse_amount("lots"), Err(Error::InvalidAmount { .. })));
    }

    #[test]
    fn signer_accepts_prefixed_and_bare_hex() {
        let expected = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

        assert_eq!(signer_from_hex(ANVIL_KEY).unwrap().address(), expected);
        assert_eq!(signer_from_hex(&format!("0x{ANVIL_KEY}")).unwrap().address(), expected);
    }

    #[test]
    fn short_or_bad_keys_are_rejected() {
        assert!(matches!(signer_from_hex("0xabcd"), Err(Error::ShortPrivateKeyHex)));
        assert!(matches!(signer_from_hex(&"zz".repeat(32)), Err(Error::InvalidPrivateKeyHex(_))));
    }
}
