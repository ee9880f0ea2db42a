use axum::{
    Json,
    extract::{Extension, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tera::Context;
use thiserror::Error;

use crate::searcher::{self, ALL_WORDS_MODE, Searcher, TextMatch};
use crate::utils::render_template;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub m: Option<String>,
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("missing search query in URL params")]
    MissingQuery,
}

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            SearchError::MissingQuery => (StatusCode::BAD_REQUEST, self.to_string()),
        };

        let body = json!({
            "error": message,
            "status": status.as_u16()
        });

        (status, Json(body)).into_response()
    }
}

// Handler for the search page
pub async fn search_page(Extension(templates): Extension<Arc<tera::Tera>>) -> impl IntoResponse {
    let mut context = Context::new();
    context.insert("query", "");
    render_template(&templates, "search.html", context)
}

// JSON API handler
pub async fn search_api(
    Query(params): Query<SearchParams>,
    State(searcher): State<Arc<Searcher>>,
) -> Result<Json<Vec<TextMatch>>, SearchError> {
    let query = params.q.as_deref().unwrap_or_default();
    if query.is_empty() {
        return Err(SearchError::MissingQuery);
    }
    let mode = params
        .m
        .as_deref()
        .filter(|m| !m.is_empty())
        .unwrap_or(ALL_WORDS_MODE);

    tracing::debug!(query, mode, "search request");
    let results = searcher::search(&searcher, query, mode).await;
    Ok(Json(results))
}

#[cfg(test)]
mod tests {
    use crate::searcher::{Searcher, sample_corpus};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::Value;
    use std::sync::Arc;
    use tera::Tera;

    fn server() -> TestServer {
        let searcher = Arc::new(Searcher::from_text(&sample_corpus()).unwrap());
        let templates = Arc::new(Tera::new("templates/**/*.html").unwrap());
        TestServer::new(crate::router(searcher, templates)).unwrap()
    }

    #[tokio::test]
    async fn missing_query_is_a_bad_request() {
        let server = server();
        let response = server.get("/search").await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: Value = response.json();
        assert_eq!(body["status"], 400);
        assert_eq!(body["error"], "missing search query in URL params");
    }

    #[tokio::test]
    async fn empty_query_is_a_bad_request() {
        let server = server();
        let response = server.get("/search").add_query_param("q", "").await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn phrase_mode_returns_structured_results() {
        let server = server();
        let response = server
            .get("/search")
            .add_query_param("q", "lazy dog")
            .add_query_param("m", "phr")
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        let results = body.as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["work"], "FIRST WORK");
        let lines = results[0]["text"].as_array().unwrap();
        assert_eq!(lines.first().unwrap(), "[...]");
        assert!(lines.iter().any(|l| l == "jumps over the lazy dog"));
    }

    #[tokio::test]
    async fn mode_defaults_to_all_words() {
        let server = server();
        let response = server.get("/search").add_query_param("q", "fox naps").await;
        response.assert_status_ok();

        let body: Value = response.json();
        let results = body.as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["work"], "SECOND WORK");
    }

    #[tokio::test]
    async fn unmatched_query_returns_empty_array() {
        let server = server();
        let response = server.get("/search").add_query_param("q", "unicorn").await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn punctuated_query_survives_url_encoding() {
        // the frontend percent-encodes with URLSearchParams; the Query
        // extractor must hand back the raw field values, commas and all,
        // for simplification to strip server-side
        let server = server();
        let response = server
            .get("/search")
            .add_query_param("q", "naps, happily")
            .add_query_param("m", "phr")
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        let results = body.as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["work"], "SECOND WORK");
    }

    #[tokio::test]
    async fn search_page_renders_the_form() {
        let server = server();
        let response = server.get("/").await;
        response.assert_status_ok();

        let html = response.text();
        assert!(html.contains("id=\"form\""));
        assert!(html.contains("id=\"result-body\""));
        assert!(html.contains("name=\"query\""));
        assert!(html.contains("name=\"mode\""));
    }
}
