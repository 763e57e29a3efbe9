//! In-memory question store.
//!
//! Questions live only for the process lifetime. Every mutation is a short
//! critical section with no await points, so callers can broadcast the
//! change immediately after the call returns.

use chrono::Utc;
use parking_lot::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{truncate, Question, Reply, ANONYMOUS_AUTHOR, MAX_NAME_LEN, MAX_TEXT_LEN};

pub struct QuestionStore {
    questions: RwLock<Vec<Question>>,
}

impl QuestionStore {
    pub fn new() -> Self {
        Self {
            questions: RwLock::new(Vec::new()),
        }
    }

    /// List contract: questions newest-first, replies in append order.
    pub fn list(&self) -> Vec<Question> {
        self.questions.read().iter().rev().cloned().collect()
    }

    pub fn create(&self, text: &str, author: Option<&str>) -> ApiResult<Question> {
        let question = Question {
            id: Uuid::new_v4(),
            text: clean_text(text)?,
            author: clean_author(author),
            created_at: Utc::now(),
            replies: Vec::new(),
        };
        self.questions.write().push(question.clone());
        info!("Created question {}", question.id);
        Ok(question)
    }

    pub fn add_reply(
        &self,
        question_id: Uuid,
        text: &str,
        author: Option<&str>,
    ) -> ApiResult<Reply> {
        let mut questions = self.questions.write();
        let question = questions
            .iter_mut()
            .find(|q| q.id == question_id)
            .ok_or(ApiError::QuestionNotFound)?;

        let reply = Reply {
            id: Uuid::new_v4(),
            text: clean_text(text)?,
            author: clean_author(author),
            created_at: Utc::now(),
        };
        question.replies.push(reply.clone());
        info!("Added reply {} to question {}", reply.id, question_id);
        Ok(reply)
    }

    /// Remove a question and all its replies in one step.
    pub fn delete(&self, question_id: Uuid) -> ApiResult<Question> {
        let mut questions = self.questions.write();
        let idx = questions
            .iter()
            .position(|q| q.id == question_id)
            .ok_or(ApiError::QuestionNotFound)?;
        let question = questions.remove(idx);
        info!("Deleted question {}", question_id);
        Ok(question)
    }

    pub fn delete_reply(&self, question_id: Uuid, reply_id: Uuid) -> ApiResult<Reply> {
        let mut questions = self.questions.write();
        let question = questions
            .iter_mut()
            .find(|q| q.id == question_id)
            .ok_or(ApiError::QuestionNotFound)?;
        let idx = question
            .replies
            .iter()
            .position(|r| r.id == reply_id)
            .ok_or(ApiError::ReplyNotFound)?;
        let reply = question.replies.remove(idx);
        info!("Deleted reply {} from question {}", reply_id, question_id);
        Ok(reply)
    }

    /// Wipe the board. Returns how many questions were dropped.
    pub fn clear(&self) -> usize {
        let mut questions = self.questions.write();
        let cleared = questions.len();
        questions.clear();
        info!("Cleared {} questions", cleared);
        cleared
    }
}

impl Default for QuestionStore {
    fn default() -> Self {
        Self::new()
    }
}

fn clean_text(text: &str) -> ApiResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidInput("Text is required".to_string()));
    }
    Ok(truncate(trimmed, MAX_TEXT_LEN))
}

fn clean_author(author: Option<&str>) -> String {
    match author.map(str::trim) {
        Some(a) if !a.is_empty() => truncate(a, MAX_NAME_LEN),
        _ => ANONYMOUS_AUTHOR.to_string(),
    }
}
