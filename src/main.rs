use actix_web::{web, App, HttpServer};
use prompt2image::{
    logger::{self, LoggerConfig},
    server::{self, AppState},
    storage::spawn_periodic_cleanup,
    Config, InferenceClient,
};
use std::time::Duration;

const CLEANUP_PERIOD: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();

    logger::init_with_config(LoggerConfig::from_env())?;

    if dotenv_loaded {
        log::info!("✅ .env file loaded");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let config = Config::load()?;
    let validation = config.validate();
    for warning in &validation.warnings {
        log::warn!("⚠️  {}", warning);
    }
    if !validation.valid {
        for error in &validation.errors {
            log::error!("❌ {}", error);
        }
        return Err(format!(
            "invalid configuration: {}",
            validation.errors.join("; ")
        )
        .into());
    }

    logger::log_startup_info(
        "Prompt2Image",
        env!("CARGO_PKG_VERSION"),
        &config.host,
        config.port,
    );
    logger::log_config_info(&config);

    let client = InferenceClient::from_config(&config)?;
    let state = AppState::new(config.clone(), client).await?;

    if config.auto_cleanup_days > 0 {
        match state.store.cleanup(config.auto_cleanup_days).await {
            Ok(removed) => log::info!("🧹 Startup cleanup removed {} images", removed),
            Err(e) => log::error!("Startup cleanup failed: {}", e),
        }
        spawn_periodic_cleanup(state.store.clone(), config.auto_cleanup_days, CLEANUP_PERIOD);
    }

    let state = web::Data::new(state);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(server::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    log::info!("👋 Server stopped");
    Ok(())
}
