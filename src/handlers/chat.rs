use actix_web::{web, Error, HttpResponse};
use log::info;

use crate::models::query::{ChatRequest, Query};
use crate::models::response::ErrorBody;
use crate::services::pipeline::QueryPipeline;
use crate::services::{AiServiceTrait, MemoryServiceTrait, SqlServiceTrait, VectorServiceTrait};

/// Handle a natural-language query: route it, run the matching
/// handler and return the assembled `ResponseState`.
pub async fn chat_query<A, S, V, M>(
    request: web::Json<ChatRequest>,
    pipeline: web::Data<QueryPipeline<A, S, V, M>>,
) -> Result<HttpResponse, Error>
where
    A: AiServiceTrait + Clone + std::fmt::Debug,
    S: SqlServiceTrait + Clone + std::fmt::Debug,
    V: VectorServiceTrait + Clone + std::fmt::Debug,
    M: MemoryServiceTrait + Clone + std::fmt::Debug,
{
    let request = request.into_inner();

    // Empty input is a client error; it never reaches the router.
    let message = request.message.trim();
    if message.is_empty() {
        return Ok(HttpResponse::BadRequest().json(ErrorBody::message("message must not be empty")));
    }
    if request.conversation_id.trim().is_empty() {
        return Ok(HttpResponse::BadRequest()
            .json(ErrorBody::message("conversation_id must not be empty")));
    }

    info!("Received query: {}", message);

    let query = Query {
        raw_text: message.to_string(),
        conversation_id: request.conversation_id,
        user_id: request.user_id,
    };

    let state = pipeline.run(query).await;
    Ok(HttpResponse::Ok().json(state))
}
