//! Answer ratings collected from chat users

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::Result;

/// Type of feedback
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackType {
    /// Answer was helpful
    Positive,
    /// Answer was not helpful
    Negative,
}

impl FeedbackType {
    pub fn to_score(&self) -> i32 {
        match self {
            FeedbackType::Positive => 1,
            FeedbackType::Negative => -1,
        }
    }

    /// Rating carried by an inline button's callback data
    pub fn from_callback(data: &str) -> Option<Self> {
        match data {
            "rate_good" => Some(FeedbackType::Positive),
            "rate_bad" => Some(FeedbackType::Negative),
            _ => None,
        }
    }
}

/// One rated answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub chat_id: i64,
    pub question: String,
    pub answer: String,
    pub rating: FeedbackType,
    pub recorded_at: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn new(chat_id: i64, question: &str, answer: &str, rating: FeedbackType) -> Self {
        Self {
            chat_id,
            question: question.to_string(),
            answer: answer.to_string(),
            rating,
            recorded_at: Utc::now(),
        }
    }
}

/// Append-only JSON lines file of feedback records
pub struct FeedbackLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FeedbackLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Log and append one record
    pub async fn record(&self, record: &FeedbackRecord) -> Result<()> {
        tracing::info!(
            chat_id = record.chat_id,
            rating = ?record.rating,
            score = record.rating.to_score(),
            "Feedback: {} ||| {}",
            record.question,
            record.answer
        );

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Every record in the log, oldest first
    pub async fn load(&self) -> Result<Vec<FeedbackRecord>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(Into::into))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_callback() {
        assert_eq!(FeedbackType::from_callback("rate_good"), Some(FeedbackType::Positive));
        assert_eq!(FeedbackType::from_callback("rate_bad"), Some(FeedbackType::Negative));
        assert_eq!(FeedbackType::from_callback("show_ctx"), None);
    }

    #[tokio::test]
    async fn test_append_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let log = FeedbackLog::new(dir.path().join("nested").join("feedback.jsonl"));
        assert!(log.load().await.unwrap().is_empty());

        log.record(&FeedbackRecord::new(1, "q1", "a1", FeedbackType::Positive))
            .await
            .unwrap();
        log.record(&FeedbackRecord::new(2, "q2", "a2", FeedbackType::Negative))
            .await
            .unwrap();

        let records = log.load().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].question, "q1");
        assert_eq!(records[1].rating, FeedbackType::Negative);

        let raw = std::fs::read_to_string(log.path()).unwrap();
        assert!(raw.lines().next().unwrap().contains("\"rating\":\"positive\""));
    }
}
