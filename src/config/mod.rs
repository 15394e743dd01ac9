use dotenv::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub gemini_api_key: String,
    pub openai_api_key: Option<String>,
    pub query_timeout_secs: u64,
    pub semantic_top_k: usize,
    pub database_url: String,
    pub redis_url: String,
    pub chroma_url: String,
    pub chroma_collection: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("SERVER_PORT must be a valid port number"),
            gemini_api_key: env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY must be set"),
            openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            query_timeout_secs: env::var("QUERY_TIMEOUT_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .expect("QUERY_TIMEOUT_SECS must be a number of seconds"),
            semantic_top_k: env::var("SEMANTIC_TOP_K")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("SEMANTIC_TOP_K must be a positive integer"),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://postgres@localhost/analytics".to_string()),
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1/".to_string()),
            chroma_url: env::var("CHROMA_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string()),
            chroma_collection: env::var("CHROMA_COLLECTION")
                .unwrap_or_else(|_| "products".to_string()),
        }
    }
}
