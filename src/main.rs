use actix_web::{middleware, web, App, HttpServer};
use codelens::api::{configure_routes, cors, AppState};
use codelens::{banner, config};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    banner::print_banner();

    if let Err(e) = dotenvy::dotenv() {
        eprintln!("⚠️  No .env file loaded ({}), using the environment as is", e);
    }

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let app_config = config::AppConfig::load().map_err(|e| {
        log::error!("Failed to load configuration: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    let host = app_config.server.host.clone();
    let port = app_config.server.port;
    let allowed_origin = app_config.server.allowed_origin.clone();

    log::info!(
        "Sandbox: {} {} (timeout {:?}, {} slots)",
        app_config.sandbox.interpreter,
        app_config.sandbox.exec_flag,
        app_config.sandbox.timeout,
        app_config.sandbox.max_concurrent
    );
    log::info!("Model: {} at {}", app_config.ollama.model, app_config.ollama.api_base);
    log::info!("Response mode: {:?}, allowed origin: {}", app_config.server.response_mode, allowed_origin);

    let state = web::Data::new(AppState::new(app_config));

    log::info!("🚀 Listening on http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(cors(&allowed_origin))
            .wrap(middleware::Logger::default())
            .configure(configure_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
