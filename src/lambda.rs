use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use std::sync::Arc;
use stock_ledger::adapters::forms::FormsRelay;
use stock_ledger::core::relay::{RelayRequest, RelayResponse};
use stock_ledger::utils::{logger, validation::Validate};
use stock_ledger::{LambdaConfig, ProductRelay};

async fn function_handler(
    relay: Arc<ProductRelay>,
    event: LambdaEvent<RelayRequest>,
) -> Result<RelayResponse, Error> {
    tracing::info!(request_id = %event.context.request_id, "Relay invoked");
    Ok(relay.handle(event.payload).await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    let config = LambdaConfig::from_env()
        .and_then(|config| config.validate().map(|_| config))
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;

    let relay = Arc::new(ProductRelay::new(FormsRelay::new(config.form_url)));

    run(service_fn(move |event: LambdaEvent<RelayRequest>| {
        let relay = relay.clone();
        async move { function_handler(relay, event).await }
    }))
    .await
}
