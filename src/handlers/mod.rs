pub mod chat;
pub mod translate;

pub use chat::*;
pub use translate::*;

use actix_web::error::InternalError;
use actix_web::{web, HttpResponse};

use crate::models::response::ErrorBody;

/// Json extractor config that reports malformed bodies in the same
/// `{"detail": {"message": ...}}` shape as the handlers' own errors.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let body = ErrorBody::message(format!("Invalid request body: {}", err));
        InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    })
}
