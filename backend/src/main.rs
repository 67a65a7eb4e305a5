use actix_files::Files;
use actix_web::{web, App, HttpServer};
use backend::config::AppConfig;
use backend::job_controller::state::{start_job_updater, JobsState};
use backend::{db, services};
use env_logger::Env;
use log::{info, warn};
use tokio::sync::mpsc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = AppConfig::load().map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let storage = &config.storage;
    std::fs::create_dir_all(&storage.sheets_dir)?;
    std::fs::create_dir_all(&storage.reports_dir)?;
    db::open(&storage.database).map_err(std::io::Error::other)?;
    if !backend::report::render::fonts_available(&storage.fonts_dir) {
        warn!(
            "no Arial or LiberationSans fonts in {}; report rendering will fail",
            storage.fonts_dir.display()
        );
    }

    let (tx, rx) = mpsc::channel(100);
    let jobs_state = JobsState::new(tx);
    let updater_state = jobs_state.clone();
    tokio::spawn(async move {
        start_job_updater(updater_state, rx).await;
    });

    let host = config.server.host.clone();
    let port = config.server.port;
    let reports_dir = storage.reports_dir.clone();
    info!("Server running at http://{}:{}", host, port);
    info!("Reports published under {}", config.server.reports_url());

    let config = web::Data::new(config);
    HttpServer::new(move || {
        App::new()
            .app_data(web::JsonConfig::default().limit(10 * 1024 * 1024)) // 10 MB
            .app_data(web::Data::new(jobs_state.clone()))
            .app_data(config.clone())
            .service(services::templates::configure_routes())
            .service(services::data_sources::csv::configure_routes())
            .service(services::reports::configure_routes())
            .service(Files::new("/reports", &reports_dir))
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
