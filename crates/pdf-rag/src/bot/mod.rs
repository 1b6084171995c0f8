//! Telegram front-end for the RAG service
//!
//! Questions are forwarded to `POST /ask`, PDFs to `POST /upload_pdf`. Each
//! answer carries buttons to show the retrieved context or rate the answer;
//! ratings are appended to a JSON lines log.

pub mod api_client;
pub mod feedback;
pub mod handler;
pub mod session;
pub mod telegram;

pub use api_client::RagApiClient;
pub use feedback::{FeedbackLog, FeedbackRecord, FeedbackType};
pub use handler::BotHandler;
pub use session::{ChatSession, ChatState, SessionStore};
pub use telegram::{ChatTransport, InlineKeyboard, TelegramClient, Update};
