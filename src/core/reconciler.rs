use crate::core::publish::PublishPendingQuestionsUseCase;
use crate::core::reset::ResetSyncUseCase;
use crate::core::results::GetQuestionResultsUseCase;
use crate::core::sync::SyncVotesUseCase;
use crate::core::{LedgerGateway, QuestionRepository, VoteRepository};
use crate::domain::model::{
    PublishReport, QuestionResults, ResetReport, StatusReport, SyncReport,
};
use crate::utils::error::Result;
use std::sync::Arc;

/// Entry point for callers (CLI, scheduler): owns the repositories and the
/// ledger gateway and runs the use cases against them.
pub struct Reconciler<Q: ?Sized, V: ?Sized, G: ?Sized> {
    questions: Arc<Q>,
    votes: Arc<V>,
    gateway: Arc<G>,
}

impl<Q, V, G> Reconciler<Q, V, G>
where
    Q: QuestionRepository + ?Sized,
    V: VoteRepository + ?Sized,
    G: LedgerGateway + ?Sized,
{
    pub fn new(questions: Arc<Q>, votes: Arc<V>, gateway: Arc<G>) -> Self {
        Self {
            questions,
            votes,
            gateway,
        }
    }

    /// Merges ledger votes from `from_block` on; returns the number of new votes.
    pub async fn sync(&self, from_block: u64) -> usize {
        self.sync_with_report(from_block).await.synced
    }

    pub async fn sync_with_report(&self, from_block: u64) -> SyncReport {
        SyncVotesUseCase::new(
            self.votes.clone(),
            self.questions.clone(),
            self.gateway.clone(),
        )
        .run(from_block)
        .await
    }

    pub async fn get_results(&self, question_id: u64) -> Result<QuestionResults> {
        GetQuestionResultsUseCase::new(self.questions.clone(), self.votes.clone())
            .execute(question_id)
            .await
    }

    pub async fn publish_pending(&self) -> Result<PublishReport> {
        PublishPendingQuestionsUseCase::new(self.questions.clone(), self.gateway.clone())
            .execute()
            .await
    }

    pub async fn publish_question(&self, question_id: u64) -> Result<PublishReport> {
        PublishPendingQuestionsUseCase::new(self.questions.clone(), self.gateway.clone())
            .execute_one(question_id)
            .await
    }

    pub async fn reset(&self) -> Result<ResetReport> {
        ResetSyncUseCase::new(self.questions.clone(), self.votes.clone())
            .execute()
            .await
    }

    pub async fn status(&self) -> Result<StatusReport> {
        let questions = self.questions.list_all().await?;
        let synced_questions = questions.iter().filter(|q| q.is_synced).count();

        Ok(StatusReport {
            questions: questions.len(),
            synced_questions,
            pending_questions: questions.len() - synced_questions,
            votes: self.votes.count().await?,
            current_block: self.gateway.current_block().await,
        })
    }
}
