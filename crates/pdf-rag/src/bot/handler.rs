//! Update dispatch and the per-chat ask/rate cycle

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::BotConfig;
use crate::error::Result;

use super::api_client::RagApiClient;
use super::feedback::{FeedbackLog, FeedbackRecord, FeedbackType};
use super::session::{ChatSession, ChatState, SessionStore};
use super::telegram::{escape_html, CallbackQuery, ChatTransport, InlineKeyboard, Message};

pub const GREETING: &str = "👋 Hi!\n\
I am a RAG bot. Ask me a question about the knowledge base or send me a PDF and I will answer as precisely as I can.\n\n\
- Just type your question, or\n\
- Send a PDF file to add it to the knowledge base.\n\n\
After an answer you can look at the context it used or rate it! 👍👎";
pub const SERVER_ERROR: &str = "❗️Server error, please try again later.";
pub const UPLOAD_ERROR: &str =
    "❗️Server error while uploading the PDF. Check that the RAG service is running.";
pub const NOT_A_PDF: &str = "Only PDF files can be added to the knowledge base.";
pub const CONTEXT_MISSING: &str = "Context was not saved";
pub const NOTHING_TO_RATE: &str = "There is no answer to rate yet. Ask a question first.";
pub const THANKS_GOOD: &str = "Thanks for the rating! 👍\n\nYour positive feedback has been saved.";
pub const THANKS_BAD: &str = "Thanks for your honesty! 👎\n\nYour negative feedback has been saved.";

pub const SHOW_CONTEXT: &str = "show_ctx";
pub const RATE_GOOD: &str = "rate_good";
pub const RATE_BAD: &str = "rate_bad";

/// Telegram refuses messages longer than this
const MAX_MESSAGE_CHARS: usize = 4096;

const ANSWER_HEADER: &str = "<b>Answer:</b>\n";
const CONTEXT_HEADER: &str = "<b>Answer context:</b>\n";

/// How often expired sessions are swept while polling
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Pause after a failed poll
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Routes chat updates to the RAG service and keeps per-chat sessions
pub struct BotHandler {
    transport: Arc<dyn ChatTransport>,
    api: RagApiClient,
    sessions: SessionStore,
    feedback: FeedbackLog,
    top_k: usize,
}

impl BotHandler {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        api: RagApiClient,
        sessions: SessionStore,
        feedback: FeedbackLog,
        top_k: usize,
    ) -> Self {
        Self {
            transport,
            api,
            sessions,
            feedback,
            top_k,
        }
    }

    /// Handler wired from bot settings
    pub fn from_config(transport: Arc<dyn ChatTransport>, config: &BotConfig) -> Result<Self> {
        Ok(Self::new(
            transport,
            RagApiClient::new(&config.api_url)?,
            SessionStore::new(
                Duration::from_secs(config.session_ttl_secs),
                config.max_sessions,
            ),
            FeedbackLog::new(config.feedback_log.clone()),
            config.top_k,
        ))
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn feedback(&self) -> &FeedbackLog {
        &self.feedback
    }

    /// Answer one update
    pub async fn handle_update(&self, update: super::telegram::Update) -> Result<()> {
        if let Some(callback) = update.callback_query {
            self.handle_callback(callback).await
        } else if let Some(message) = update.message {
            self.handle_message(message).await
        } else {
            Ok(())
        }
    }

    async fn handle_message(&self, message: Message) -> Result<()> {
        let chat_id = message.chat.id;

        if let Some(document) = message.document {
            let is_pdf = document.mime_type.as_deref() == Some("application/pdf");
            if !is_pdf {
                return self.reply(chat_id, NOT_A_PDF, None).await;
            }
            let filename = pdf_filename(document.file_name.as_deref());
            return self.handle_pdf(chat_id, &document.file_id, &filename).await;
        }

        let Some(text) = message.text else {
            return Ok(());
        };
        let text = text.trim();

        if text == "/start" || text.starts_with("/start ") {
            return self.reply(chat_id, GREETING, None).await;
        }
        if text.is_empty() || text.starts_with('/') {
            return Ok(());
        }

        self.handle_question(chat_id, text).await
    }

    async fn handle_pdf(&self, chat_id: i64, file_id: &str, filename: &str) -> Result<()> {
        tracing::info!(chat_id, "Received PDF {}", filename);

        let data = match self.transport.download_file(file_id).await {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(chat_id, "PDF download failed: {}", e);
                return self.reply(chat_id, UPLOAD_ERROR, None).await;
            }
        };

        match self.api.upload_pdf(filename, data).await {
            Ok(uploaded) => {
                let text = match uploaded.chunks {
                    Some(chunks) => format!(
                        "📄 PDF uploaded: {} ({} chunks)\nNow you can ask a question about this document!",
                        escape_html(&uploaded.status),
                        chunks
                    ),
                    None => format!(
                        "📄 PDF uploaded: {}\nNow you can ask a question about this document!",
                        escape_html(&uploaded.status)
                    ),
                };
                self.reply(chat_id, &text, None).await
            }
            Err(e) => {
                tracing::error!(chat_id, "PDF upload failed: {}", e);
                self.reply(chat_id, UPLOAD_ERROR, None).await
            }
        }
    }

    async fn handle_question(&self, chat_id: i64, question: &str) -> Result<()> {
        let answer = match self.api.ask(question, self.top_k).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!(chat_id, "Question failed: {}", e);
                return self.reply(chat_id, SERVER_ERROR, None).await;
            }
        };

        self.sessions.put(
            chat_id,
            ChatSession::answered(question, answer.context(), &answer.answer),
        );

        let text = html_message(ANSWER_HEADER, &answer.answer);
        self.reply(chat_id, &text, Some(&reaction_keyboard())).await
    }

    async fn handle_callback(&self, callback: CallbackQuery) -> Result<()> {
        if let Err(e) = self.transport.answer_callback(&callback.id).await {
            tracing::warn!("Failed to answer callback {}: {}", callback.id, e);
        }

        let Some(chat_id) = callback.message.as_ref().map(|m| m.chat.id) else {
            return Ok(());
        };
        let data = callback.data.as_deref().unwrap_or_default();

        if data == SHOW_CONTEXT {
            let context = self
                .sessions
                .get(chat_id)
                .and_then(|s| s.last_context)
                .filter(|c| !c.is_empty());
            let text = html_message(
                CONTEXT_HEADER,
                context.as_deref().unwrap_or(CONTEXT_MISSING),
            );
            return self.reply(chat_id, &text, None).await;
        }

        let Some(rating) = FeedbackType::from_callback(data) else {
            tracing::debug!(chat_id, "Ignoring callback data {:?}", data);
            return Ok(());
        };

        let pending = self
            .sessions
            .get(chat_id)
            .filter(|s| s.state == ChatState::AwaitingReaction);
        let Some(session) = pending else {
            return self.reply(chat_id, NOTHING_TO_RATE, None).await;
        };

        let record = FeedbackRecord::new(
            chat_id,
            session.last_question.as_deref().unwrap_or_default(),
            session.last_answer.as_deref().unwrap_or_default(),
            rating,
        );
        if let Err(e) = self.feedback.record(&record).await {
            tracing::error!(chat_id, "Failed to store feedback: {}", e);
        }
        self.sessions.set_state(chat_id, ChatState::Idle);

        let text = match rating {
            FeedbackType::Positive => THANKS_GOOD,
            FeedbackType::Negative => THANKS_BAD,
        };
        self.reply(chat_id, text, None).await
    }

    async fn reply(&self, chat_id: i64, text: &str, keyboard: Option<&InlineKeyboard>) -> Result<()> {
        self.transport.send_message(chat_id, text, keyboard).await
    }

    /// Poll for updates until ctrl-c
    pub async fn run(&self, poll_timeout_secs: u64) -> Result<()> {
        self.run_until(poll_timeout_secs, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for ctrl-c: {}", e);
            }
        })
        .await
    }

    /// Poll for updates until `shutdown` completes, one update at a time
    pub async fn run_until<F>(&self, poll_timeout_secs: u64, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut offset = 0i64;
        let mut sweep = tokio::time::interval(SESSION_SWEEP_INTERVAL);

        tracing::info!("Bot polling for updates...");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Bot stopped");
                    return Ok(());
                }
                _ = sweep.tick() => {
                    self.sessions.evict_expired();
                }
                polled = self.transport.get_updates(offset, poll_timeout_secs) => {
                    match polled {
                        Ok(updates) => {
                            for update in updates {
                                offset = offset.max(update.update_id + 1);
                                let update_id = update.update_id;
                                if let Err(e) = self.handle_update(update).await {
                                    tracing::warn!("Update {} failed: {}", update_id, e);
                                }
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Polling failed: {}", e);
                            tokio::time::sleep(POLL_RETRY_DELAY).await;
                        }
                    }
                }
            }
        }
    }
}

/// Buttons under every answer
pub fn reaction_keyboard() -> InlineKeyboard {
    InlineKeyboard::default()
        .row(vec![("Show context", SHOW_CONTEXT)])
        .row(vec![("👍 Good", RATE_GOOD), ("👎 Bad", RATE_BAD)])
}

/// Name to upload an attached PDF under
fn pdf_filename(name: Option<&str>) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) if name.to_ascii_lowercase().ends_with(".pdf") => name.to_string(),
        Some(name) => format!("{}.pdf", name),
        None => "document.pdf".to_string(),
    }
}

/// `header` followed by the escaped `body`, cut so the message fits
///
/// The body is shortened before escaping so no entity is split.
fn html_message(header: &str, body: &str) -> String {
    let budget = MAX_MESSAGE_CHARS.saturating_sub(header.chars().count());
    format!("{}{}", header, escape_html(&truncate(body, budget)))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
