//! Command line entry points of the scripts.
//!
//! Every binary reads the same configuration record and the same environment, then runs one
//! operation. Values specific to the operation can be overridden on the command line.

use crate::{
    callback::CallbackWait,
    config::{self, parse_amount, ChainEnv, QrngConfig, DEFAULT_CONFIG_PATH},
    fund::{self, FundRequest},
    params::{self, RequestParameters},
    request,
};
use alloy::{
    network::EthereumWallet,
    providers::{Provider, ProviderBuilder},
};
use clap::Parser;
use std::{
    io::{self, stdout},
    path::PathBuf,
    time::Duration,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Errors from the script CLIs
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// the configuration record could not be loaded
    #[error("configuration: {0}")]
    Config(eyre::Report),
    /// environment or value error
    #[error(transparent)]
    Env(#[from] config::Error),
    /// the sponsor wallet could not be derived
    #[error("sponsor wallet derivation: {0}")]
    Sponsor(#[from] qrng_sponsor::Error),
    /// funding failed
    #[error(transparent)]
    Fund(#[from] fund::Error),
    /// setting the request parameters failed
    #[error(transparent)]
    Params(#[from] params::Error),
    /// the random number request failed
    #[error(transparent)]
    Request(#[from] request::Error),
    /// the result could not be written
    #[error("writing output: {0}")]
    Output(#[from] io::Error),
}

/// Options shared by every script.
#[derive(clap::Args, Debug)]
pub struct CommonOpts {
    /// Path to the TOML configuration record.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Confirmations to wait for. Defaults to the value in the configuration record.
    #[arg(long)]
    pub confirmations: Option<u64>,
}

impl CommonOpts {
    fn load(&self) -> Result<(QrngConfig, ChainEnv, u64), Error> {
        let config = QrngConfig::from_path(&self.config).map_err(Error::Config)?;
        let env = ChainEnv::from_env()?;
        let confirmations = self.confirmations.unwrap_or(config.requester.confirmations);
        info!(
            config = %self.config.display(),
            rpc_url = %env.rpc_url,
            confirmations,
            "loaded configuration"
        );
        Ok((config, env, confirmations))
    }
}

fn connect(env: ChainEnv) -> impl Provider {
    let wallet = EthereumWallet::from(env.signer);
    ProviderBuilder::new().wallet(wallet).on_http(env.rpc_url)
}

/// Derive the sponsor wallet of the requester and fund it.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct FundOpts {
    #[command(flatten)]
    common: CommonOpts,

    /// Amount to send in ether. Defaults to the value in the configuration record.
    #[arg(long)]
    amount: Option<String>,
}

impl FundOpts {
    /// Run the sponsor funder.
    #[instrument(skip_all)]
    pub async fn run(self) -> Result<(), Error> {
        let (config, env, confirmations) = self.common.load()?;
        let amount_display = self.amount.unwrap_or(config.funding.amount);

        let request = FundRequest {
            airnode: config.oracle.airnode,
            airnode_xpub: config.oracle.xpub,
            requester: config.requester.address,
            amount: parse_amount(&amount_display)?,
            amount_display,
        };

        let provider = connect(env);
        fund::fund_sponsor(&provider, &request, confirmations, &mut stdout()).await?;
        Ok(())
    }
}

/// Set the request parameters of the requester contract.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct SetParamsOpts {
    #[command(flatten)]
    common: CommonOpts,
}

impl SetParamsOpts {
    /// Run the parameter setter.
    #[instrument(skip_all)]
    pub async fn run(self) -> Result<(), Error> {
        let (config, env, confirmations) = self.common.load()?;

        let params = RequestParameters {
            airnode: config.oracle.airnode,
            endpoint_id: config.oracle.endpoint_id,
            sponsor_wallet: config.sponsor_wallet()?,
        };

        let provider = connect(env);
        params::set_request_parameters(
            &provider,
            config.requester.address,
            params,
            confirmations,
            &mut stdout(),
        )
        .await?;
        Ok(())
    }
}

/// Request random numbers and print them once the oracle responds.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct RequestOpts {
    #[command(flatten)]
    common: CommonOpts,

    /// How many random numbers to request. Defaults to the value in the configuration record.
    #[arg(long)]
    count: Option<u64>,

    /// Seconds to wait for the callback. Defaults to the value in the configuration record.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl RequestOpts {
    /// Run the random number requester. `cancel` aborts the wait for the callback.
    #[instrument(skip_all)]
    pub async fn run(self, cancel: CancellationToken) -> Result<(), Error> {
        let (config, env, confirmations) = self.common.load()?;

        let count = self.count.unwrap_or(config.request.count);
        let mut wait: CallbackWait = config.request.callback_wait();
        if let Some(secs) = self.timeout_secs {
            wait.timeout = Duration::from_secs(secs);
        }

        let provider = connect(env);
        let fulfilled = request::request_random_numbers(
            &provider,
            config.requester.address,
            count,
            confirmations,
            wait,
            &cancel,
            &mut stdout(),
        )
        .await?;

        request::print_outcome(&mut stdout(), &fulfilled.outcome)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn opts_are_well_formed() {
        FundOpts::command().debug_assert();
        SetParamsOpts::command().debug_assert();
        RequestOpts::command().debug_assert();
    }

    #[test]
    fn request_overrides_parse() {
        let opts = RequestOpts::try_parse_from([
            "request-rands",
            "--config",
            "deploy/sepolia.toml",
            "--count",
            "5",
            "--timeout-secs",
            "60",
        ])
        .unwrap();

        assert_eq!(opts.common.config, PathBuf::from("deploy/sepolia.toml"));
        assert_eq!(opts.common.confirmations, None);
        assert_eq!(opts.count, Some(5));
        assert_eq!(opts.timeout_secs, Some(60));
    }

    #[test]
    fn config_path_defaults() {
        let opts = FundOpts::try_parse_from(["fund-sponsor", "--amount", "0.5"]).unwrap();

        assert_eq!(opts.common.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert_eq!(opts.amount.as_deref(), Some("0.5"));
    }
}
