use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub id: Option<u64>,
    pub text: String,
    #[serde(default)]
    pub votes: u64,
}

impl Choice {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            votes: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: Option<u64>,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    #[serde(default)]
    pub choices: Vec<Choice>,

    // 區塊鏈相關欄位
    #[serde(default)]
    pub external_id: Option<u64>,
    #[serde(default)]
    pub is_synced: bool,
    #[serde(default)]
    pub tx_hash: Option<String>,
}

impl Question {
    pub fn new(text: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self {
            id: None,
            text: text.into(),
            pub_date: Utc::now(),
            choices,
            external_id: None,
            is_synced: false,
            tx_hash: None,
        }
    }

    pub fn choice_texts(&self) -> Vec<String> {
        self.choices.iter().map(|c| c.text.clone()).collect()
    }
}

/// A vote merged from the ledger. `question_id` is always the local id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub question_id: u64,
    pub choice_index: u64,
    pub voter_address: String,
    pub tx_hash: String,
    pub block_number: u64,
    pub log_index: u64,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A `VoteCast` event as delivered by a ledger gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteEvent {
    pub external_question_id: u64,
    pub choice_index: u64,
    pub voter: String,
    pub tx_hash: String,
    pub block_number: u64,
    pub log_index: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub success: bool,
    pub tx_hash: Option<String>,
    /// Absent when the ledger confirms asynchronously.
    pub external_id: Option<u64>,
    pub error: Option<String>,
}

impl SubmitOutcome {
    pub fn submitted(tx_hash: String, external_id: Option<u64>) -> Self {
        Self {
            success: true,
            tx_hash: Some(tx_hash),
            external_id,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted,
    /// The (tx_hash, log_index) key was already stored.
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceResult {
    pub text: String,
    pub votes: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResults {
    pub question_text: String,
    pub total_votes: u64,
    pub choices: Vec<ChoiceResult>,
    pub is_synced: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub fetched: usize,
    pub synced: usize,
    pub duplicates: usize,
    pub unmatched: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReport {
    pub submitted: usize,
    /// Earlier submissions whose external id was found on a later pass.
    pub confirmed: usize,
    /// Submitted questions still waiting for their receipt.
    pub pending: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetReport {
    pub questions: usize,
    pub votes: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub questions: usize,
    pub synced_questions: usize,
    pub pending_questions: usize,
    pub votes: usize,
    pub current_block: u64,
}
