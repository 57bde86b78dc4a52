#![warn(clippy::all, clippy::pedantic)]

use actix_web::{App, HttpServer, middleware::Logger, web};
use sitepulse_service::{Config, MonitoringScheduler, build_registry};
use tracing::info;

mod error;
mod identity;
mod routes;
#[cfg(test)]
mod test_support;

use error::AppError;

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    // A missing .env file is not an error
    dotenvy::dotenv().ok();
    logger::init();

    let config = Config::from_config(None::<&std::path::Path>)?;
    run_server(config).await
}

async fn run_server(config: Config) -> Result<(), AppError> {
    let registry = build_registry(&config).await?;

    let scheduler = if config.scheduler.enabled {
        Some(MonitoringScheduler::new(registry.clone(), &config.scheduler)?.start())
    } else {
        info!("Scheduler disabled, sites are only checked on request");
        None
    };

    let data = web::Data::from(registry);
    let addr = (config.server.bind.as_str(), config.server.port);
    info!(bind = %config.server.bind, port = config.server.port, "Starting HTTP server");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(data.clone())
            .configure(routes::routes)
    })
    .bind(addr)?
    .run()
    .await?;

    if let Some(handle) = scheduler {
        handle.abort();
    }

    Ok(())
}
