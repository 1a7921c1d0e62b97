// ABOUTME: Application assembly: shared state, the route table and the server lifecycle
// ABOUTME: App owns storage from startup until shutdown() closes the connection pool

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth;
use crate::config::Config;
use crate::error::AppError;
use crate::handlers::{self, links, notes, tags, users, workspaces};
use crate::middleware;
use crate::storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(storage: Storage, config: Config) -> Self {
        Self {
            storage: Arc::new(storage),
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/me", get(users::me))
        .route("/workspaces", get(workspaces::list).post(workspaces::create))
        .route(
            "/workspaces/:id",
            get(workspaces::get)
                .patch(workspaces::update)
                .delete(workspaces::delete),
        )
        .route(
            "/workspaces/:id/permissions",
            get(workspaces::list_permissions).put(workspaces::grant_permission),
        )
        .route(
            "/workspaces/:id/permissions/:user_id",
            delete(workspaces::revoke_permission),
        )
        .route("/workspaces/:id/notes", get(notes::list).post(notes::create))
        .route(
            "/workspaces/:id/tags",
            get(tags::list_for_workspace).post(tags::create_for_workspace),
        )
        .route(
            "/workspaces/:id/tags/:tag_id",
            delete(tags::remove_from_workspace),
        )
        .route(
            "/notes/:id",
            get(notes::get)
                .put(notes::update)
                .patch(notes::update)
                .delete(notes::delete),
        )
        .route("/notes/:id/restore", post(notes::restore))
        .route(
            "/notes/:id/diffs",
            get(notes::list_diffs).post(notes::apply_diff),
        )
        .route(
            "/notes/:id/tags",
            get(tags::list_for_note).post(tags::add_to_note),
        )
        .route("/notes/:id/tags/:tag_id", delete(tags::remove_from_note))
        .route("/notes/:id/links", get(links::list_for_note))
        .route("/links", post(links::create))
        .route("/links/:id", delete(links::delete))
        .route_layer(from_fn_with_state(state.clone(), auth::require_user));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/users", post(users::register))
        .merge(protected)
        .fallback(route_not_found)
        .layer(from_fn_with_state(state.clone(), middleware::error_diagnostics))
        .layer(from_fn(middleware::security_headers))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn route_not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

/// The running service. Built once by `main`, torn down once by `shutdown`.
pub struct App {
    state: AppState,
}

impl App {
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let storage = Storage::connect(&config.database_url).await?;
        Ok(Self {
            state: AppState::new(storage, config),
        })
    }

    pub fn config(&self) -> &Config {
        &self.state.config
    }

    /// Serves until `shutdown_signal` resolves and in-flight requests drain.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown_signal: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = router(self.state.clone());
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
    }

    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.state.storage.close().await?;
        tracing::info!("Storage closed");
        Ok(())
    }
}
