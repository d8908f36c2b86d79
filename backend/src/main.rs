use actix_cors::Cors;
use actix_files::Files;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use log::{error, info};

use deposit_backend::config::Settings;
use deposit_backend::inference::DepositPredictor;
use deposit_backend::routes;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_module_path(false)
        .init();

    let settings = Settings::from_env();
    info!("starting deposit subscription predictor");
    info!("loading artifact from {}", settings.model_path.display());

    let predictor = match DepositPredictor::load(&settings.model_path) {
        Ok(predictor) => predictor,
        Err(e) => {
            error!("{}", e);
            return Err(e).context("artifact could not be loaded, refusing to serve");
        }
    };
    let info = predictor.model_info();
    info!(
        "model ready: {} ({} input features)",
        info.classifier, info.input_width
    );

    let predictor = web::Data::new(predictor);
    let settings_data = web::Data::new(settings.clone());
    let bind_address = settings.bind_address();
    let allowed_origins = settings.allowed_origins.clone();
    let json_limit = settings.json_limit;
    let static_dir = settings.static_dir.clone();

    info!("listening on http://{}", bind_address);
    info!("workers: {}", settings.workers);
    info!("cors origins: {}", settings.allowed_origins.join(", "));
    info!("routes:");
    info!("   GET  /                     - form");
    info!("   GET  /api/form             - form descriptors");
    info!("   GET  /api/health           - liveness");
    info!("   GET  /api/model-info       - artifact summary");
    info!("   GET  /api/stats            - prediction counters");
    info!("   POST /api/predict          - positional form submission");
    info!("   POST /api/predict/record   - named record");
    info!("   POST /api/batch-predict    - list of named records");

    HttpServer::new(move || {
        let cors = allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec![actix_web::http::header::CONTENT_TYPE])
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(DefaultHeaders::new().add(("X-Content-Type-Options", "nosniff")))
            .wrap(cors)
            .app_data(predictor.clone())
            .app_data(settings_data.clone())
            .app_data(routes::json_config(json_limit))
            .configure(routes::configure)
            .route("/", web::get().to(routes::index))
            .service(Files::new("/static", static_dir.clone()).prefer_utf8(true))
            .default_service(web::route().to(routes::not_found))
    })
    .workers(settings.workers)
    .bind(&bind_address)
    .with_context(|| format!("cannot bind {}", bind_address))?
    .run()
    .await?;

    Ok(())
}
