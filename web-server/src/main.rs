// web-server/src/main.rs
use std::io;
use std::sync::Arc;

use actix::Actor;
use actix_web::{middleware, web, App, HttpServer};
use common::auth::SignatureVerifier;
use common::{setup_tracing, BotGateway, Config, TelegramGateway};
use web_server::static_files::{self, IndexPage};
use web_server::{api, MessageLog, SessionRegistryActor};

#[actix_web::main]
async fn main() -> io::Result<()> {
    setup_tracing();

    let config = Config::from_env();

    // Save address before moving config into web::Data
    let server_addr = config.web_server_addr.clone();

    if config.bot.token.is_empty() {
        tracing::error!("Telegram bot token not configured; logins and relaying will fail");
    }

    let message_log = MessageLog::open(&config.database.path)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    let gateway = TelegramGateway::new(&config.bot)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    let gateway: Arc<dyn BotGateway> = Arc::new(gateway);

    let index_page = IndexPage::load(&config.static_files, &config.bot.bot_name)?;

    let registry = SessionRegistryActor::new()
        .with_ttl(config.session.ttl_seconds)
        .with_cleanup_interval(config.session.cleanup_interval_seconds)
        .start();

    let verifier_data = web::Data::new(SignatureVerifier::new(config.bot.token.clone()));
    let registry_data = web::Data::new(registry);
    let log_data = web::Data::new(message_log);
    let gateway_data: web::Data<dyn BotGateway> = web::Data::from(gateway);
    let index_data = web::Data::new(index_page);
    let static_config = config.static_files.clone();
    let config_data = web::Data::new(config);

    tracing::info!("Starting Web Server on {}", server_addr);

    HttpServer::new(move || {
        App::new()
            // Path only; the login callback carries the signed assertion in its query
            .wrap(middleware::Logger::new("%a \"%U\" %s %b %T"))
            .app_data(config_data.clone())
            .app_data(verifier_data.clone())
            .app_data(registry_data.clone())
            .app_data(log_data.clone())
            .app_data(gateway_data.clone())
            .app_data(index_data.clone())
            .configure(api::configure)
            .configure(|cfg| static_files::configure(cfg, &static_config))
    })
    .bind(&server_addr)?
    .run()
    .await
}
