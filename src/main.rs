mod config;
mod handlers;
mod models;
mod services;

use std::time::Duration;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};

use config::Config;
use handlers::{chat_query, json_config, translate};
use services::pipeline::QueryPipeline;
use services::AiService;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("🚀 Starting Analytics Chat API");

    // Load configuration from environment variables
    let config = Config::from_env();
    let ai_service = AiService::new(&config);
    let timeout = Duration::from_secs(config.query_timeout_secs);

    #[cfg(not(feature = "external-services"))]
    {
        use services::memory_conversation::MemoryConversationService;
        use services::memory_sql::MemorySqlService;
        use services::memory_vector::MemoryVectorService;

        log::info!("💾 Using in-memory services for local development");
        let sql_service = MemorySqlService::new();
        let vector_service = MemoryVectorService::new();
        let memory_service = MemoryConversationService::new();

        let pipeline = QueryPipeline::new(
            ai_service.clone(),
            sql_service,
            vector_service,
            memory_service,
            config.semantic_top_k,
            timeout,
        );

        let server_url = format!("http://127.0.0.1:{}", config.server_port);
        log::info!("🌐 Starting server at {}", server_url);

        HttpServer::new(move || {
            App::new()
                .wrap(Logger::default())
                .wrap(Cors::permissive())
                .app_data(json_config())
                .app_data(web::Data::new(pipeline.clone()))
                .app_data(web::Data::new(ai_service.clone()))
                .service(web::resource("/api/chat/query").route(web::post().to(chat_query::<
                    AiService,
                    MemorySqlService,
                    MemoryVectorService,
                    MemoryConversationService,
                >)))
                .service(
                    web::resource("/api/translate").route(web::post().to(translate::<AiService>)),
                )
        })
        .bind(format!("127.0.0.1:{}", config.server_port))
        .map_err(|e| {
            log::error!("❌ Failed to bind to port {}: {}", config.server_port, e);
            e
        })?
        .run()
        .await
    }

    #[cfg(feature = "external-services")]
    {
        use services::{database, ChromaService, PostgresService, RedisMemoryService};

        log::info!("🔌 Connecting to external services");
        let pool = database::connect(&config.database_url)
            .await
            .expect("Failed to connect to Postgres");
        let sql_service = PostgresService::new(pool);
        let vector_service = ChromaService::new(&config.chroma_url, &config.chroma_collection);
        let memory_service = RedisMemoryService::new(&config.redis_url)
            .expect("Failed to open Redis connection");

        let pipeline = QueryPipeline::new(
            ai_service.clone(),
            sql_service,
            vector_service,
            memory_service,
            config.semantic_top_k,
            timeout,
        );

        let server_url = format!("http://127.0.0.1:{}", config.server_port);
        log::info!("🌐 Starting server at {}", server_url);

        HttpServer::new(move || {
            App::new()
                .wrap(Logger::default())
                .wrap(Cors::permissive())
                .app_data(json_config())
                .app_data(web::Data::new(pipeline.clone()))
                .app_data(web::Data::new(ai_service.clone()))
                .service(web::resource("/api/chat/query").route(web::post().to(chat_query::<
                    AiService,
                    PostgresService,
                    ChromaService,
                    RedisMemoryService,
                >)))
                .service(
                    web::resource("/api/translate").route(web::post().to(translate::<AiService>)),
                )
        })
        .bind(format!("127.0.0.1:{}", config.server_port))
        .map_err(|e| {
            log::error!("❌ Failed to bind to port {}: {}", config.server_port, e);
            e
        })?
        .run()
        .await
    }
}
