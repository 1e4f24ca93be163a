use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;

use craftquote_core::config::{AppConfig, LoadOptions};
use craftquote_core::domain::rules::{MaterialGroup, PriceLevel};
use craftquote_core::domain::template::{DimensionKind, Dimensions, MaterialId, TemplateId};
use craftquote_core::pricing::{DeterministicPricingEngine, EvaluationRequest, PricingEngine};
use craftquote_core::PricingError;
use craftquote_db::repositories::{SqlRuleRepository, SqlTemplateRepository};
use craftquote_db::connect_with_settings;

use crate::commands::CommandResult;

#[derive(Debug, clap::Args)]
pub struct EvaluateArgs {
    #[arg(long, help = "Product template id")]
    pub template: String,
    #[arg(long, help = "Selected material id")]
    pub material: String,
    #[arg(long, help = "Material group of the selected material (for modifier-gated rules)")]
    pub material_group: Option<String>,
    #[arg(long, default_value_t = 1, help = "Order quantity")]
    pub quantity: u32,
    #[arg(long, default_value = "retail", help = "Price level: retail|wholesale|contract")]
    pub price_level: String,
    #[arg(
        long = "dim",
        value_name = "KIND=CM",
        help = "Requested dimension, e.g. --dim width=135 (repeatable)"
    )]
    pub dimensions: Vec<String>,
}

pub fn run(args: EvaluateArgs) -> CommandResult {
    let request = match build_request(&args) {
        Ok(request) => request,
        Err(message) => {
            return CommandResult::failure("evaluate", "invalid_argument", message, 2);
        }
    };

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "evaluate",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "evaluate",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        let engine = DeterministicPricingEngine::new(
            SqlTemplateRepository::new(pool.clone()),
            SqlRuleRepository::new(pool.clone()),
        );
        let outcome = engine.evaluate(&request).await;
        pool.close().await;
        outcome.map_err(|error| match &error {
            PricingError::ThresholdExceeded { .. } => {
                ("threshold_exceeded", error.to_string(), 7u8)
            }
            PricingError::UnknownTemplate { .. } => ("unknown_template", error.to_string(), 6u8),
            PricingError::RepositoryUnavailable { .. } => {
                ("repository_unavailable", error.to_string(), 4u8)
            }
            PricingError::InvalidConfiguration { .. } => {
                ("invalid_configuration", error.to_string(), 5u8)
            }
        })
    });

    match result {
        Ok(price) => {
            let message =
                format!("final price {} {}", price.final_price, config.pricing.currency);
            match serde_json::to_value(&price) {
                Ok(data) => CommandResult::success_with_data("evaluate", message, data),
                Err(error) => CommandResult::failure(
                    "evaluate",
                    "serialization",
                    format!("failed to encode price result: {error}"),
                    8,
                ),
            }
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("evaluate", error_class, message, exit_code)
        }
    }
}

fn build_request(args: &EvaluateArgs) -> Result<EvaluationRequest, String> {
    if args.quantity == 0 {
        return Err("quantity must be at least 1".to_string());
    }
    let price_level = PriceLevel::from_str(&args.price_level).map_err(|error| error.to_string())?;
    let requested_dimensions = parse_dimensions(&args.dimensions)?;

    Ok(EvaluationRequest {
        template_id: TemplateId(args.template.clone()),
        requested_dimensions,
        selected_material_id: MaterialId(args.material.clone()),
        material_group: args.material_group.clone().map(MaterialGroup),
        quantity: args.quantity,
        price_level,
    })
}

fn parse_dimensions(raw: &[String]) -> Result<Dimensions, String> {
    let mut dimensions = BTreeMap::new();
    for entry in raw {
        let (kind, value) = entry
            .split_once('=')
            .ok_or_else(|| format!("invalid dimension `{entry}`, expected KIND=CM"))?;
        let kind = DimensionKind::from_str(kind).map_err(|error| error.to_string())?;
        let value = Decimal::from_str(value.trim())
            .map_err(|error| format!("invalid dimension value `{value}`: {error}"))?;
        if value <= Decimal::ZERO {
            return Err(format!("dimension `{entry}` must be positive"));
        }
        dimensions.insert(kind, value);
    }
    Ok(dimensions)
}
