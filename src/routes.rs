use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::catalog::{Catalog, Category};
use crate::fetcher::HttpFeedClient;
use crate::pipeline::{fetch_recent_posts, FetchWarning};
use crate::session::{
    group_by_category, validate_days, CategoryCount, CategoryGroup, Session, MAX_DAYS, MIN_DAYS,
};

pub struct AppState {
    pub catalog: Catalog,
    pub client: HttpFeedClient,
    pub session: RwLock<Session>,
    pub refreshing: RwLock<bool>,
    pub default_days: u32,
}

impl AppState {
    pub fn new(catalog: Catalog, client: HttpFeedClient, default_days: u32) -> Self {
        Self {
            catalog,
            client,
            session: RwLock::new(Session::new()),
            refreshing: RwLock::new(false),
            default_days,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/catalog", get(catalog))
        .route("/fetch", post(fetch))
        .route("/posts", get(posts))
        .route("/status", get(status))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            AppError::Conflict(m) => (StatusCode::CONFLICT, m),
            AppError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, format!("Error: {}", message)).into_response()
    }
}

/// Window and categories named in a query string.
///
/// `category` may repeat; names can contain commas so they are never split.
#[derive(Debug, Default, PartialEq)]
pub struct Selection {
    pub days: Option<u32>,
    pub categories: Vec<String>,
}

fn query_pairs(query: Option<&str>) -> Result<Vec<(String, String)>, AppError> {
    serde_urlencoded::from_str(query.unwrap_or(""))
        .map_err(|e| AppError::BadRequest(format!("Invalid query: {}", e)))
}

pub fn parse_selection(query: Option<&str>) -> Result<Selection, AppError> {
    let mut selection = Selection::default();
    for (key, value) in query_pairs(query)? {
        match key.as_str() {
            "days" => {
                let days = value.parse().ok().and_then(validate_days).ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "days must be between {} and {}, got '{}'",
                        MIN_DAYS, MAX_DAYS, value
                    ))
                })?;
                selection.days = Some(days);
            }
            "category" => selection.categories.push(value),
            _ => {}
        }
    }

    Ok(selection)
}

/// Only the `category` keys of a query; every other key is ignored.
pub fn parse_categories(query: Option<&str>) -> Result<Vec<String>, AppError> {
    Ok(query_pairs(query)?
        .into_iter()
        .filter(|(key, _)| key == "category")
        .map(|(_, value)| value)
        .collect())
}

/// Run `task` while holding the `refreshing` flag.
///
/// The task clears the flag itself when it completes; if it panics the
/// flag is cleared here instead.
async fn run_exclusive<T, F>(state: &AppState, task: F) -> Result<T, AppError>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    // Check if already refreshing
    {
        let mut refreshing = state.refreshing.write().await;
        if *refreshing {
            return Err(AppError::Conflict("A fetch is already in progress".to_string()));
        }
        *refreshing = true;
    }

    match tokio::spawn(task).await {
        Ok(value) => Ok(value),
        Err(e) => {
            *state.refreshing.write().await = false;
            Err(AppError::Internal(format!("Fetch task failed: {}", e)))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FetchSummary {
    pub days: u32,
    pub total: usize,
    pub categories: Vec<CategoryCount>,
    pub warnings: Vec<FetchWarning>,
}

#[derive(Debug, Serialize)]
pub struct PostsResponse {
    pub days: Option<u32>,
    pub total: usize,
    pub showing: usize,
    pub groups: Vec<CategoryGroup>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub refreshing: bool,
    pub days: Option<u32>,
    pub total: usize,
    pub warnings: usize,
}

// Route handlers
pub async fn catalog(State(state): State<Arc<AppState>>) -> Json<Vec<Category>> {
    Json(state.catalog.categories().to_vec())
}

/// Run the pipeline over all sources, or those of the selected categories,
/// and replace the session with the result.
pub async fn fetch(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Json<FetchSummary>, AppError> {
    let selection = parse_selection(query.as_deref())?;
    let days = selection.days.unwrap_or(state.default_days);

    if let Some(unknown) = selection
        .categories
        .iter()
        .find(|name| state.catalog.category(name).is_none())
    {
        return Err(AppError::BadRequest(format!("Unknown category '{}'", unknown)));
    }

    let sources = if selection.categories.is_empty() {
        state.catalog.all_sources()
    } else {
        state.catalog.sources_in(&selection.categories)
    };

    // The run finishes and clears the flag even if this request goes away
    let task_state = state.clone();
    let summary = run_exclusive(&state, async move {
        let outcome = fetch_recent_posts(
            &task_state.client,
            &task_state.catalog,
            &sources,
            days,
        )
        .await;

        let session = Session::from_outcome(outcome, days);
        let summary = FetchSummary {
            days,
            total: session.len(),
            categories: session.category_counts(),
            warnings: session.warnings().to_vec(),
        };

        *task_state.session.write().await = session;
        *task_state.refreshing.write().await = false;
        summary
    })
    .await?;
    info!("Session replaced with {} posts", summary.total);

    Ok(Json(summary))
}

pub async fn posts(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Json<PostsResponse>, AppError> {
    let categories = parse_categories(query.as_deref())?;
    let session = state.session.read().await;

    let selected = session.filter(&categories);
    Ok(Json(PostsResponse {
        days: session.days(),
        total: session.len(),
        showing: selected.len(),
        groups: group_by_category(&selected),
    }))
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let refreshing = *state.refreshing.read().await;
    let session = state.session.read().await;
    Json(StatusResponse {
        refreshing,
        days: session.days(),
        total: session.len(),
        warnings: session.warnings().len(),
    })
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
