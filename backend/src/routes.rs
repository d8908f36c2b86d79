use std::time::Instant;

use actix_files::NamedFile;
use actix_web::{error::InternalError, get, post, web, HttpRequest, HttpResponse, Responder};
use log::{error, info};

use crate::config::Settings;
use crate::error::PredictionError;
use crate::inference::DepositPredictor;
use crate::models::{ApiResponse, PositionalRequest, PositionalResponse, PredictionResult};
use crate::schema::{CustomerRecord, FORM_SPEC};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        .service(form)
        .service(model_info)
        .service(stats)
        .service(predict)
        .service(predict_record)
        .service(batch_predict);
}

/// Body decoding errors answer with the same envelope as everything else.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| {
            let resp = HttpResponse::BadRequest().json(ApiResponse::<()>::error(&err.to_string()));
            InternalError::from_response(err, resp).into()
        })
}

#[get("/api/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::success("deposit subscription predictor is up"))
}

#[get("/api/form")]
async fn form() -> impl Responder {
    HttpResponse::Ok().json(&FORM_SPEC)
}

#[get("/api/model-info")]
async fn model_info(predictor: web::Data<DepositPredictor>) -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::success(predictor.model_info()))
}

#[get("/api/stats")]
async fn stats(predictor: web::Data<DepositPredictor>) -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::success(predictor.stats()))
}

/// Form submission: positional values in, the label text out.
#[post("/api/predict")]
async fn predict(
    predictor: web::Data<DepositPredictor>,
    req: web::Json<PositionalRequest>,
) -> Result<HttpResponse, PredictionError> {
    let record = CustomerRecord::from_positional(req.into_inner().data)?;
    let result = run_blocking(predictor, move |p| p.predict(&record)).await?;
    Ok(HttpResponse::Ok().json(PositionalResponse {
        data: vec![result.label.to_string()],
    }))
}

#[post("/api/predict/record")]
async fn predict_record(
    predictor: web::Data<DepositPredictor>,
    req: web::Json<CustomerRecord>,
) -> impl Responder {
    let start_time = Instant::now();
    let record = req.into_inner();

    match run_blocking(predictor, move |p| p.predict(&record)).await {
        Ok(result) => {
            info!("prediction: {}", result.label);
            HttpResponse::Ok().json(ApiResponse::success(result).timed(start_time.elapsed().as_millis()))
        }
        Err(e) => error_envelope::<PredictionResult>(e, start_time),
    }
}

#[post("/api/batch-predict")]
async fn batch_predict(
    predictor: web::Data<DepositPredictor>,
    req: web::Json<Vec<CustomerRecord>>,
) -> impl Responder {
    let start_time = Instant::now();
    let records = req.into_inner();
    info!("batch prediction request: {} records", records.len());

    if records.is_empty() {
        return HttpResponse::BadRequest().json(
            ApiResponse::<Vec<PredictionResult>>::error("empty record list")
                .timed(start_time.elapsed().as_millis()),
        );
    }

    match run_blocking(predictor, move |p| p.batch_predict(&records)).await {
        Ok(results) => {
            info!("batch prediction done: {} results", results.len());
            HttpResponse::Ok()
                .json(ApiResponse::success(results).timed(start_time.elapsed().as_millis()))
        }
        Err(e) => error_envelope::<Vec<PredictionResult>>(e, start_time),
    }
}

pub async fn index(req: HttpRequest, settings: web::Data<Settings>) -> HttpResponse {
    match NamedFile::open_async(settings.static_dir.join("index.html")).await {
        Ok(file) => file.into_response(&req),
        Err(e) => {
            error!("cannot open form page: {}", e);
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("form page unavailable"))
        }
    }
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::<()>::error("endpoint not found"))
}

/// Runs CPU-bound prediction work off the async workers.
async fn run_blocking<T, F>(
    predictor: web::Data<DepositPredictor>,
    f: F,
) -> Result<T, PredictionError>
where
    F: FnOnce(&DepositPredictor) -> Result<T, PredictionError> + Send + 'static,
    T: Send + 'static,
{
    web::block(move || f(&predictor)).await.map_err(|e| {
        error!("blocking pool failure: {}", e);
        PredictionError::Model("prediction worker unavailable".into())
    })?
}

fn error_envelope<T: serde::Serialize>(err: PredictionError, start_time: Instant) -> HttpResponse {
    use actix_web::ResponseError;

    err.log();
    HttpResponse::build(err.status_code())
        .json(ApiResponse::<T>::error(&err.to_string()).timed(start_time.elapsed().as_millis()))
}
