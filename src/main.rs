// src/main.rs
use basket_puzzle::api;
use basket_puzzle::config::AppConfig;

#[tokio::main]
async fn main() {
    if let Err(err) = dotenvy::dotenv() {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("⚠️ Could not load .env: {}", err);
        }
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let app_config = AppConfig::from_env();
    let session_config = app_config.game.session_config();

    println!("🧺 Basket puzzle service starting...");
    println!(
        "📐 Basket {} x {} x {}, {} s per round, stock holds {}",
        session_config.basket.width,
        session_config.basket.height,
        session_config.basket.depth,
        session_config.round_duration_ms / 1000,
        session_config.max_stock
    );

    let addr = app_config.api.socket_addr();
    if let Err(err) = api::start_api_server(app_config.api, app_config.game).await {
        eprintln!("❌ API server on {} terminated with an error: {}", addr, err);
        std::process::exit(1);
    }
}
