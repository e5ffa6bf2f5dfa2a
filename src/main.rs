use std::sync::Arc;

use anyhow::Result;
use dotenv::dotenv;

use token_faucet::chain::EthTokenClient;
use token_faucet::configure;
use token_faucet::faucet::{AdmissionGate, DispatchWorker, FaucetConfig, FaucetState};
use token_faucet::gateway::{create_app, AppState};
use token_faucet::logger;
use token_faucet::recaptcha::RecaptchaClient;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let config = configure::load_config()?;
    logger::setup_logger(&config).map_err(|e| anyhow::anyhow!("logger setup failed: {}", e))?;

    let faucet_config = FaucetConfig::from_app_config(&config)?;
    let client = Arc::new(EthTokenClient::new(&config)?);

    let state = Arc::new(FaucetState::new(faucet_config.queue_size));

    let worker = Arc::new(DispatchWorker::new(
        state.clone(),
        client.clone(),
        faucet_config.token_per_request,
    ));
    let worker_handle = worker.spawn();

    let gate = AdmissionGate::new(state.clone(), client, faucet_config);
    let verifier = Arc::new(RecaptchaClient::new(config.recaptcha_secret.clone()));

    let app = create_app(Arc::new(AppState {
        gate,
        state,
        verifier,
    }));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    log::info!("Server is running on http://{}", config.listen_addr);

    // The worker loop never returns; if its task ends the queue has no
    // consumer and the process must not keep accepting requests.
    tokio::select! {
        result = async { axum::serve(listener, app).await } => {
            result?;
        }
        result = worker_handle => {
            log::error!("Dispatch worker exited: {:?}", result);
            anyhow::bail!("dispatch worker exited unexpectedly");
        }
    }

    Ok(())
}
