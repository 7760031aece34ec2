use dotenvy::dotenv;
use marketplace_service::{build_server, create_pool, run_migrations, AppConfig, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match create_pool(&config.database_url) {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("Failed to create database connection pool: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = run_migrations(&pool) {
        log::error!("Failed to run database migrations: {}", e);
        std::process::exit(1);
    }

    log::info!(
        "Starting server at http://{}:{} (currency {}, platform fee {})",
        config.host,
        config.port,
        config.currency,
        config.platform_fee_rate
    );

    let state = AppState::from_config(pool, &config);
    build_server(state, &config.host, config.port)?.await
}
