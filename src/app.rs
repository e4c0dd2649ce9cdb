use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use ratecard::engine::parse_batch;
use ratecard::{Estimator, OverrideRatecard, RegistryStore, UsageRequest};
use serde_json::json;

use crate::cli::{AppError, Cli, Commands, EstimateArgs};
use crate::output::{
    batch_json, estimate_json, model_json, models_json, print_batch_table, print_estimate_table,
    print_json, print_model_table, print_models_table, print_providers_table, providers_json,
    version_json,
};
use crate::utils::read_input;

pub(crate) struct CommandContext<'a> {
    pub(crate) estimator: &'a Estimator,
    pub(crate) json: bool,
    pub(crate) use_color: bool,
}

pub(crate) fn open_estimator(cli: &Cli) -> Result<Estimator, AppError> {
    let dir = cli.registry_dir();
    let store = RegistryStore::open_dir(&dir).map_err(|source| AppError::Registry {
        path: dir.display().to_string(),
        source,
    })?;
    debug!(
        registry = %dir.display(),
        pricing_version = store.pricing_version(),
        "pricing registry opened"
    );
    Ok(Estimator::new(Arc::new(store)).with_default_mode(cli.default_mode()))
}

pub(crate) fn run(cli: &Cli) -> Result<(), AppError> {
    let estimator = open_estimator(cli)?;
    let ctx = CommandContext {
        estimator: &estimator,
        json: cli.json,
        use_color: cli.use_color(),
    };

    match &cli.command {
        Commands::Estimate(args) => handle_estimate(args, &ctx),
        Commands::Batch { file } => handle_batch(file, &ctx),
        Commands::Providers => {
            handle_providers(&ctx);
            Ok(())
        }
        Commands::Models { provider, rates } => handle_models(provider, *rates, &ctx),
        Commands::Model { provider, model } => handle_model(provider, model, &ctx),
        Commands::Version => {
            handle_version(&ctx);
            Ok(())
        }
    }
}

fn load_override(path: &Path) -> Result<OverrideRatecard, AppError> {
    let text = read_input(path)?;
    serde_json::from_str(&text).map_err(|e| {
        AppError::Engine(ratecard::EngineError::invalid(
            "Override ratecard validation failed",
            json!({ "path": path.display().to_string(), "reason": e.to_string() }),
        ))
    })
}

fn build_request(args: &EstimateArgs) -> Result<UsageRequest, AppError> {
    if let Some(path) = &args.request {
        let mut request = UsageRequest::from_json(&read_input(path)?)?;
        // Flags still refine a file request
        if let Some(mode) = args.mode {
            request.options.mode = Some(mode.into());
        }
        if args.pricing_version.is_some() {
            request.options.pricing_version = args.pricing_version.clone();
        }
        if args.currency.is_some() {
            request.options.currency = args.currency.clone();
        }
        return Ok(request);
    }
    let override_card = args.ratecard.as_deref().map(load_override).transpose()?;
    Ok(args.to_request(override_card)?)
}

fn handle_estimate(args: &EstimateArgs, ctx: &CommandContext<'_>) -> Result<(), AppError> {
    let request = build_request(args)?;
    let result = ctx.estimator.estimate(&request)?;
    if ctx.json {
        print_json(&estimate_json(&result));
    } else {
        print_estimate_table(&result, ctx.use_color);
    }
    Ok(())
}

fn handle_batch(file: &Path, ctx: &CommandContext<'_>) -> Result<(), AppError> {
    let requests = parse_batch(&read_input(file)?)?;
    let batch = ctx.estimator.estimate_batch(&requests)?;
    if ctx.json {
        print_json(&batch_json(&batch));
    } else {
        print_batch_table(&batch, ctx.use_color);
    }
    Ok(())
}

fn handle_providers(ctx: &CommandContext<'_>) {
    let providers = ctx.estimator.list_providers();
    let version = ctx.estimator.current_version();
    if ctx.json {
        print_json(&providers_json(version, &providers));
    } else if providers.is_empty() {
        println!("No providers found in the pricing registry.");
    } else {
        print_providers_table(version, &providers, ctx.use_color);
    }
}

fn handle_models(provider: &str, rates: bool, ctx: &CommandContext<'_>) -> Result<(), AppError> {
    let listing = ctx.estimator.list_models(provider, rates)?;
    let version = ctx.estimator.current_version();
    if ctx.json {
        print_json(&models_json(version, &listing));
    } else {
        print_models_table(version, &listing, ctx.use_color);
    }
    Ok(())
}

fn handle_model(provider: &str, model: &str, ctx: &CommandContext<'_>) -> Result<(), AppError> {
    let (provider, entry) = ctx.estimator.model_details(provider, model)?;
    let version = ctx.estimator.current_version();
    if ctx.json {
        print_json(&model_json(version, &provider, &entry));
    } else {
        print_model_table(version, &provider, &entry, ctx.use_color);
    }
    Ok(())
}

fn handle_version(ctx: &CommandContext<'_>) {
    let version = ctx.estimator.current_version();
    if ctx.json {
        print_json(&version_json(version));
    } else {
        println!("pricing {version}, engine {}", ratecard::consts::ENGINE_VERSION);
    }
}

/// Render a failed command: JSON envelope on stdout, or a message on stderr
pub(crate) fn report_error(error: &AppError, json: bool) {
    if json {
        print_json(&error.to_envelope());
    } else {
        eprintln!("Error: {error}");
    }
}
