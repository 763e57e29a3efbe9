//! Question and reply handlers.
//!
//! Every successful mutation is broadcast to all connected clients in the
//! same handler call; only the optional generated answer lands later, as a
//! second independent write with its own broadcast.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AppState;
use crate::error::ApiResult;
use crate::events::ServerEvent;
use crate::models::{CreatePostInput, Question, Reply, BOT_AUTHOR};

/// GET /questions
pub async fn list_questions(State(state): State<AppState>) -> Json<Vec<Question>> {
    info!("GET /questions");
    Json(state.store.list())
}

/// POST /questions
pub async fn create_question(
    State(state): State<AppState>,
    Json(input): Json<CreatePostInput>,
) -> ApiResult<(StatusCode, Json<Question>)> {
    info!("POST /questions");
    state.maintenance.ensure_writable()?;

    let question = state.store.create(&input.text, input.author.as_deref())?;
    state
        .hub
        .broadcast(&ServerEvent::NewQuestion(question.clone()), None);

    if input.use_ai {
        spawn_generated_reply(state.clone(), question.id, question.text.clone());
    }

    Ok((StatusCode::CREATED, Json(question)))
}

/// POST /questions/{id}/replies
pub async fn create_reply(
    Path(question_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(input): Json<CreatePostInput>,
) -> ApiResult<(StatusCode, Json<Reply>)> {
    info!("POST /questions/{}/replies", question_id);
    state.maintenance.ensure_writable()?;

    let reply = state
        .store
        .add_reply(question_id, &input.text, input.author.as_deref())?;
    state.hub.broadcast(
        &ServerEvent::NewReply {
            question_id,
            reply: reply.clone(),
        },
        None,
    );

    if input.use_ai {
        spawn_generated_reply(state.clone(), question_id, reply.text.clone());
    }

    Ok((StatusCode::CREATED, Json(reply)))
}

/// DELETE /questions/{id} (admin)
pub async fn delete_question(
    Path(question_id): Path<Uuid>,
    State(state): State<AppState>,
) -> ApiResult<Json<Question>> {
    info!("DELETE /questions/{}", question_id);
    let question = state.store.delete(question_id)?;
    state
        .hub
        .broadcast(&ServerEvent::DeleteQuestion { id: question_id }, None);
    Ok(Json(question))
}

/// DELETE /questions/{id}/replies/{rid} (admin)
pub async fn delete_reply(
    Path((question_id, reply_id)): Path<(Uuid, Uuid)>,
    State(state): State<AppState>,
) -> ApiResult<Json<Reply>> {
    info!("DELETE /questions/{}/replies/{}", question_id, reply_id);
    let reply = state.store.delete_reply(question_id, reply_id)?;
    state.hub.broadcast(
        &ServerEvent::DeleteReply {
            question_id,
            reply_id,
        },
        None,
    );
    Ok(Json(reply))
}

/// DELETE /admin/questions (admin) - wipe the whole board.
pub async fn clear_questions(State(state): State<AppState>) -> Json<Value> {
    info!("DELETE /admin/questions");
    let cleared = state.store.clear();
    state.hub.broadcast(&ServerEvent::ClearAll, None);
    Json(json!({ "cleared": cleared }))
}

/// Ask the generator for an answer after the primary write has already
/// been acknowledged and broadcast. The two phases are not atomic: clients
/// may observe the question or reply long before the generated answer, and
/// the question may even be gone by the time the answer arrives.
fn spawn_generated_reply(state: AppState, question_id: Uuid, prompt: String) {
    tokio::spawn(async move {
        let answer = state.ai.generate(&prompt).await;
        match state.store.add_reply(question_id, &answer, Some(BOT_AUTHOR)) {
            Ok(reply) => {
                state.hub.broadcast(
                    &ServerEvent::NewReply {
                        question_id,
                        reply,
                    },
                    None,
                );
            }
            Err(e) => warn!(
                "[@AnswerBot] Could not append answer to question {}: {}",
                question_id, e
            ),
        }
    });
}
