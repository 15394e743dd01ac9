use actix_web::{web, Error, HttpResponse};
use log::error;

use crate::models::response::{ErrorBody, TranslateRequest, TranslateResponse};
use crate::services::tools::translation_prompt;
use crate::services::AiServiceTrait;

/// Translate arbitrary text to English via the capability provider
pub async fn translate<A>(
    request: web::Json<TranslateRequest>,
    ai_service: web::Data<A>,
) -> Result<HttpResponse, Error>
where
    A: AiServiceTrait + Clone + std::fmt::Debug,
{
    let text = request.text.trim();
    if text.is_empty() {
        return Ok(HttpResponse::BadRequest().json(ErrorBody::message("text must not be empty")));
    }

    match ai_service.generate(&translation_prompt(text)).await {
        Ok(translated) => Ok(HttpResponse::Ok().json(TranslateResponse { translated })),
        Err(e) => {
            error!("Translation failed: {}", e);
            Ok(HttpResponse::BadGateway()
                .json(ErrorBody::error(format!("Translation failed: {}", e))))
        }
    }
}
