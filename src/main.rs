mod handlers;
mod routes;
mod state;

use crate::routes::{api_v1_routes, public_routes};
use crate::state::{build_orchestrator, AppState};
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use chrono::Local;
use log::{info, warn};
use orchestra::config::{AppConfig, ConfigStore};
use orchestra::drivers::install_schema;
use sqlx::any::AnyPoolOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    let mut log_builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    log_builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S %:z"),
                record.level(),
                record.args()
            )
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e)) // 转换为 io::Result
        })
        .init();

    let config = AppConfig::from_env()?;
    config.validate()?;

    // 编排配置文件不存在时只使用包内默认配置
    let config_path = Path::new(&config.orchestration.config_path);
    let store = if config_path.exists() {
        ConfigStore::load(config_path)?
    } else {
        warn!(
            "Orchestration config {} not found, using package defaults",
            config_path.display()
        );
        ConfigStore::empty()
    };
    let store = Arc::new(store.with_test_mode(config.orchestration.test_mode));

    let db_pool = match &config.database {
        Some(database) => {
            sqlx::any::install_default_drivers();
            let pool = AnyPoolOptions::new()
                .max_connections(database.max_connections)
                .connect(&database.url)
                .await
                .context("Failed to connect to database")?;
            install_schema(&pool).await?;
            info!("Database driver enabled");
            Some(pool)
        }
        None => {
            info!("DATABASE_URL not set, database driver disabled");
            None
        }
    };

    let orchestrator = Arc::new(build_orchestrator(store, db_pool.clone()));
    let app_state = web::Data::new(AppState::new(orchestrator, config.clone(), db_pool));

    info!("Listening on {}", config.bind_address());

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(Logger::default())
            .service(api_v1_routes())
            .service(public_routes())
    })
    .bind(config.bind_address())?;

    if let Some(workers) = config.server.workers {
        server = server.workers(workers);
    }

    server.run().await?;
    info!("Server stopped");
    Ok(())
}
