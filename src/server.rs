use std::net::SocketAddr;

use axum::{
    Form, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use eyre::Result;
use log::{error, info};
use serde::Deserialize;

use crate::output::{render_error, render_page};
use crate::shell::{Interaction, Shell};

/// Query string of a text-entry re-evaluation
#[derive(Debug, Default, Deserialize)]
pub struct EntryQuery {
    #[serde(default)]
    pub url: String,
}

/// Form posted by the generate button
#[derive(Debug, Default, Deserialize)]
pub struct GenerateForm {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub generate: bool,
}

async fn index(State(shell): State<Shell>, Query(query): Query<EntryQuery>) -> Response {
    respond(&shell, Interaction::entered(query.url)).await
}

async fn submit(State(shell): State<Shell>, Form(form): Form<GenerateForm>) -> Response {
    let interaction = Interaction {
        url: form.url,
        generate: form.generate,
    };
    respond(&shell, interaction).await
}

async fn healthz() -> &'static str {
    "ok"
}

async fn respond(shell: &Shell, interaction: Interaction) -> Response {
    match shell.run(&interaction).await {
        Ok(stage) => {
            info!(
                "Interaction settled at {stage} (video: {}, generate: {})",
                stage.video_id().unwrap_or("-"),
                interaction.generate
            );
            Html(render_page(&interaction.url, &stage)).into_response()
        }
        Err(e) => {
            error!("Interaction failed: {e:?}");
            (StatusCode::INTERNAL_SERVER_ERROR, Html(render_error(&interaction.url, &e))).into_response()
        }
    }
}

/// Create the router for the notes UI
pub fn create_router(shell: Shell) -> Router {
    Router::new()
        .route("/", get(index).post(submit))
        .route("/healthz", get(healthz))
        .with_state(shell)
}

/// Serve the UI until the process is stopped
pub async fn serve(addr: SocketAddr, shell: Shell) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, create_router(shell)).await?;
    Ok(())
}
