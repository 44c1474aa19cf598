use crate::domain::model::{Question, SaveOutcome, SubmitOutcome, Vote, VoteEvent};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    async fn get_by_id(&self, question_id: u64) -> Result<Option<Question>>;
    async fn get_by_external_id(&self, external_id: u64) -> Result<Option<Question>>;
    /// Create-or-update. Assigns a local id when the question has none.
    async fn save(&self, question: Question) -> Result<Question>;
    async fn list_pending_sync(&self) -> Result<Vec<Question>>;
    async fn list_all(&self) -> Result<Vec<Question>>;
}

#[async_trait]
pub trait VoteRepository: Send + Sync {
    /// Enforces uniqueness of (tx_hash, log_index); a repeat is `Duplicate`, not an error.
    async fn save(&self, vote: Vote) -> Result<SaveOutcome>;
    async fn exists(&self, tx_hash: &str, log_index: u64) -> Result<bool>;
    async fn list_for_question(&self, question_id: u64) -> Result<Vec<Vote>>;
    async fn count(&self) -> Result<usize>;
    /// Deletes every stored vote and returns how many were removed.
    async fn clear(&self) -> Result<usize>;
}

/// Access to the external ledger. Implementations absorb their own failures:
/// they log and return an empty list, a failed outcome or block 0.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    async fn fetch_vote_events(&self, from_block: u64) -> Vec<VoteEvent>;
    async fn submit_question(&self, text: &str, choices: &[String]) -> SubmitOutcome;
    async fn current_block(&self) -> u64;

    /// External id created by an earlier `submit_question` transaction, once
    /// its receipt is available.
    async fn lookup_question(&self, _tx_hash: &str) -> Option<u64> {
        None
    }
}

#[async_trait]
impl<G: LedgerGateway + ?Sized> LedgerGateway for Arc<G> {
    async fn fetch_vote_events(&self, from_block: u64) -> Vec<VoteEvent> {
        (**self).fetch_vote_events(from_block).await
    }

    async fn submit_question(&self, text: &str, choices: &[String]) -> SubmitOutcome {
        (**self).submit_question(text, choices).await
    }

    async fn current_block(&self) -> u64 {
        (**self).current_block().await
    }

    async fn lookup_question(&self, tx_hash: &str) -> Option<u64> {
        (**self).lookup_question(tx_hash).await
    }
}

#[async_trait]
impl<R: QuestionRepository + ?Sized> QuestionRepository for Arc<R> {
    async fn get_by_id(&self, question_id: u64) -> Result<Option<Question>> {
        (**self).get_by_id(question_id).await
    }

    async fn get_by_external_id(&self, external_id: u64) -> Result<Option<Question>> {
        (**self).get_by_external_id(external_id).await
    }

    async fn save(&self, question: Question) -> Result<Question> {
        (**self).save(question).await
    }

    async fn list_pending_sync(&self) -> Result<Vec<Question>> {
        (**self).list_pending_sync().await
    }

    async fn list_all(&self) -> Result<Vec<Question>> {
        (**self).list_all().await
    }
}

#[async_trait]
impl<R: VoteRepository + ?Sized> VoteRepository for Arc<R> {
    async fn save(&self, vote: Vote) -> Result<SaveOutcome> {
        (**self).save(vote).await
    }

    async fn exists(&self, tx_hash: &str, log_index: u64) -> Result<bool> {
        (**self).exists(tx_hash, log_index).await
    }

    async fn list_for_question(&self, question_id: u64) -> Result<Vec<Vote>> {
        (**self).list_for_question(question_id).await
    }

    async fn count(&self) -> Result<usize> {
        (**self).count().await
    }

    async fn clear(&self) -> Result<usize> {
        (**self).clear().await
    }
}
