//! Question answering endpoint

use axum::{extract::rejection::FormRejection, extract::State, Form, Json};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{Answer, AskForm};

/// POST /ask - Answer a question from the collection
pub async fn ask(
    State(state): State<AppState>,
    form: std::result::Result<Form<AskForm>, FormRejection>,
) -> Result<Json<Answer>> {
    let Form(form) = form.map_err(|e| Error::invalid_input(e.body_text()))?;
    let top_k = form.top_k.unwrap_or(state.config().server.default_top_k);

    tracing::info!("Question (top_k={}): {}", top_k, form.query);

    let answer = state
        .pipeline()
        .generate_answer(&form.query, state.collection(), top_k)
        .await?;

    Ok(Json(answer))
}
