//! HTTP routes of the coordinator

use actix_web::{HttpResponse, error, get, post, web};
use serde_json::json;
use unified_logging_entities::{ExpirationRequest, SearchRequest};

use crate::error::CoordError;
use crate::handler::Handler;

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(health)
        .service(search)
        .service(expire);
}

/// Malformed bodies answer with the same error shape as every other failure
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        error::Error::from(CoordError::invalid_argument(message))
    })
}

#[get("/healthz")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": "unified-logging-coord",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[post("/v1/search")]
async fn search(handler: web::Data<Handler>, request: web::Json<SearchRequest>) -> Result<HttpResponse, CoordError> {
    let response = handler.search(request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[post("/v1/expire")]
async fn expire(
    handler: web::Data<Handler>,
    request: web::Json<ExpirationRequest>,
) -> Result<HttpResponse, CoordError> {
    let success = handler.expire(request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(success))
}
