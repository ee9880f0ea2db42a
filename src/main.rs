use axum::{Router, extract::Extension, routing::get};
use std::sync::Arc;
use tera::Tera;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod search;
mod searcher;
mod text;
mod utils;

use searcher::Searcher;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let corpus_path =
        std::env::var("CORPUS_PATH").unwrap_or_else(|_| "completeworks.txt".into());
    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".into());

    // Corpus loading and indexing
    let searcher = match Searcher::load(&corpus_path) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("Failed to load corpus {}: {}", corpus_path, e);
            std::process::exit(1);
        }
    };

    // Templates configuration
    let templates = match Tera::new("templates/**/*.html") {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Template parsing error: {}", e);
            std::process::exit(1);
        }
    };
    let templates = Arc::new(templates);

    let app = router(searcher, templates);

    // Start server
    let listener = match TcpListener::bind(format!("0.0.0.0:{}", port)).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to address: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("listening on port {port}");

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}

fn router(searcher: Arc<Searcher>, templates: Arc<Tera>) -> Router {
    Router::new()
        // Search page
        .route("/", get(search::search_page))
        // Search API
        .route("/search", get(search::search_api))
        // Static files
        .nest_service("/static", ServeDir::new("static"))
        // Shared state and layers
        .with_state(searcher)
        .layer(Extension(templates))
}
