use clap::Parser;
use serde::Serialize;
use std::sync::Arc;
use stock_ledger::adapters::sharepoint::build_http_client;
use stock_ledger::adapters::token::{ContextInfoTokenProvider, StaticTokenProvider};
use stock_ledger::config::cli::Command;
use stock_ledger::config::toml_config::AuthConfig;
use stock_ledger::core::history;
use stock_ledger::domain::model::{ProductKey, ProductQuery};
use stock_ledger::domain::ports::{ConfigProvider, TokenProvider};
use stock_ledger::utils::error::ErrorCategory;
use stock_ledger::utils::{logger, validation::Validate};
use stock_ledger::{
    CliConfig, LedgerConfig, LedgerError, MovementLedger, MovementWriter, ProductDirectory,
    Result, SharePointClient,
};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    logger::init_cli_logger(cli.verbose);
    tracing::debug!("CLI config: {:?}", cli);

    let config = match LedgerConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(exit_code(&e));
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(exit_code(&e));
    }

    if let Err(e) = run(cli, config).await {
        tracing::error!("Operation failed: {} (Category: {:?})", e, e.category());
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(exit_code(&e));
    }
}

fn exit_code(e: &LedgerError) -> i32 {
    if e.is_validation() {
        return 2;
    }
    match e.category() {
        ErrorCategory::StoreUnavailable | ErrorCategory::AuthenticationTokenMissing => 3,
        ErrorCategory::Configuration => 4,
        _ => 1,
    }
}

fn token_provider(config: &LedgerConfig, client: reqwest::Client) -> Box<dyn TokenProvider> {
    match &config.auth {
        AuthConfig::ContextInfo => Box::new(ContextInfoTokenProvider::new(config.site_url(), client)),
        AuthConfig::Static { .. } => Box::new(StaticTokenProvider::new(
            config.static_digest().map(str::to_string),
        )),
    }
}

fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", human());
    }
    Ok(())
}

fn product_key(key: stock_ledger::config::cli::KeyArgs) -> Result<ProductKey> {
    ProductKey::try_from(ProductQuery::from(key))
}

async fn run(cli: CliConfig, config: LedgerConfig) -> Result<()> {
    let client = build_http_client(&config)?;
    let tokens = token_provider(&config, client.clone());
    let policy = config.balance_policy();

    let store = Arc::new(SharePointClient::with_client(config, tokens, client));
    let directory = ProductDirectory::new(store.clone());
    let ledger = MovementLedger::new(store.clone());
    let writer = MovementWriter::new(store).with_policy(policy);

    match cli.command {
        Command::Register(args) => {
            let product = writer.register_product(args.into()).await?;
            emit(cli.json, &product, || {
                format!("✅ Product {} registered", product.factory_code)
            })
        }
        Command::Lookup { key, all } => {
            let key = product_key(key)?;
            if all {
                let products = directory.find_products(&key).await?;
                emit(cli.json, &products, || {
                    products
                        .iter()
                        .map(|p| format!("{}\t{}\t{}", p.factory_code, p.supplier_code, p.description))
                        .collect::<Vec<_>>()
                        .join("\n")
                })
            } else {
                let product = directory
                    .find_product(&key)
                    .await?
                    .ok_or_else(|| LedgerError::ProductNotFound {
                        key: key.to_string(),
                    })?;
                emit(cli.json, &product, || {
                    format!(
                        "{} | {} | {} | {} | {}",
                        product.factory_code,
                        product.supplier_code,
                        product.description,
                        product.supplier_name,
                        product.unit_of_measure
                    )
                })
            }
        }
        Command::Inbound {
            key,
            quantity,
            unit_value,
            invoice,
        } => {
            let form = writer.prepare_inbound(&product_key(key)?).await?;
            let movement = writer
                .submit_inbound(&form, quantity, unit_value, &invoice)
                .await?;
            emit(cli.json, &movement, || {
                format!(
                    "✅ Inbound of {} {} recorded (total {:.2})",
                    movement.quantity, movement.factory_code, movement.total_value
                )
            })
        }
        Command::Outbound {
            factory_code,
            quantity,
            truck_plate,
            recipient,
        } => {
            let form = writer.prepare_outbound(&factory_code).await?;
            tracing::info!(balance = form.balance, "Current balance for {}", form.product.factory_code);
            let movement = writer
                .submit_outbound(&form, quantity, &truck_plate, &recipient)
                .await?;
            emit(cli.json, &movement, || {
                format!(
                    "✅ Outbound of {} {} recorded (balance before: {})",
                    movement.quantity, movement.factory_code, form.balance
                )
            })
        }
        Command::Balance { key } => {
            let (product, balance) = ledger.balance_for(&product_key(key)?).await?;
            let summary = serde_json::json!({
                "factoryCode": product.factory_code,
                "description": product.description,
                "unitOfMeasure": product.unit_of_measure,
                "balance": balance,
            });
            emit(cli.json, &summary, || {
                format!(
                    "{} ({}): {} {}",
                    product.factory_code, product.description, balance, product.unit_of_measure
                )
            })
        }
        Command::History { factory_code, csv } => {
            let code = factory_code.trim().to_uppercase();
            let movements = history::history(&ledger, &code).await?;

            if let Some(path) = csv {
                stock_ledger::utils::validation::validate_path("csv", &path)?;
                let file = std::fs::File::create(&path)?;
                history::write_csv(&movements, file)?;
                println!("📁 {} movements written to {}", movements.len(), path);
                return Ok(());
            }

            emit(cli.json, &movements, || {
                movements
                    .iter()
                    .map(|m| {
                        let when = m
                            .recorded_at()
                            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                            .unwrap_or_else(|| "-".to_string());
                        format!("{}\t{:+}", when, m.signed_quantity())
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
    }
}
