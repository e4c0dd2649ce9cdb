//! CLI subcommand definitions

use std::path::PathBuf;

use clap::{Args, Subcommand};
use ratecard::{EngineError, OverrideRatecard, UsageRequest};
use serde_json::json;

use super::args::ModeArg;

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Estimate the cost of one request
    Estimate(EstimateArgs),
    /// Estimate up to 100 requests from a JSON file ("-" for stdin)
    Batch {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// List providers in the pricing snapshot
    Providers,
    /// List a provider's models
    Models {
        /// Provider name or alias
        provider: String,
        /// Include each model's base rates
        #[arg(long)]
        rates: bool,
    },
    /// Show one model's full pricing, tiers included
    Model {
        /// Provider name or alias
        provider: String,
        /// Model name or alias
        model: String,
    },
    /// Show the loaded pricing version and engine version
    Version,
}

#[derive(Args)]
pub(crate) struct EstimateArgs {
    /// Read the whole request from a JSON file ("-" for stdin)
    #[arg(long, value_name = "FILE", conflicts_with_all = ["provider", "model", "usage", "ratecard"])]
    pub(crate) request: Option<PathBuf>,

    /// Provider name or alias
    #[arg(short, long, required_unless_present = "request")]
    pub(crate) provider: Option<String>,

    /// Model name or alias
    #[arg(short, long, required_unless_present = "request")]
    pub(crate) model: Option<String>,

    /// Usage quantity, repeatable (e.g. -u output_tokens=350)
    #[arg(short, long = "usage", value_name = "DIMENSION=QUANTITY")]
    pub(crate) usage: Vec<String>,

    /// Unpriced-usage policy for this request
    #[arg(long, value_enum)]
    pub(crate) mode: Option<ModeArg>,

    /// Pricing version to require ("latest" for the loaded snapshot)
    #[arg(long, value_name = "VERSION")]
    pub(crate) pricing_version: Option<String>,

    /// Currency to require
    #[arg(long)]
    pub(crate) currency: Option<String>,

    /// Price with this override ratecard JSON instead of the registry
    #[arg(long, value_name = "FILE")]
    pub(crate) ratecard: Option<PathBuf>,
}

impl EstimateArgs {
    /// Build a request from flags. `override_card` is the parsed `--ratecard` file.
    pub(crate) fn to_request(
        &self,
        override_card: Option<OverrideRatecard>,
    ) -> Result<UsageRequest, EngineError> {
        let mut request = UsageRequest::new(
            self.provider.clone().unwrap_or_default(),
            self.model.clone().unwrap_or_default(),
        );
        for raw in &self.usage {
            let (dimension, quantity) = parse_usage_arg(raw)?;
            request = request.with_usage(dimension, quantity);
        }
        request.options.mode = self.mode.map(Into::into);
        request.options.pricing_version = self.pricing_version.clone();
        request.options.currency = self.currency.clone();
        request.overrides.ratecard = override_card;
        Ok(request)
    }
}

fn parse_usage_arg(raw: &str) -> Result<(&str, i64), EngineError> {
    let invalid = || {
        EngineError::invalid(
            format!("Invalid usage argument \"{raw}\" (expected DIMENSION=QUANTITY)"),
            json!({ "argument": raw }),
        )
    };
    let (dimension, quantity) = raw.split_once('=').ok_or_else(invalid)?;
    let quantity = quantity.trim().parse::<i64>().map_err(|_| invalid())?;
    Ok((dimension.trim(), quantity))
}
