use crate::core::{QuestionRepository, VoteRepository};
use crate::domain::model::ResetReport;
use crate::utils::error::Result;

/// Unlinks every synced question from the ledger and drops the merged votes,
/// so the next publish and sync start from scratch.
pub struct ResetSyncUseCase<Q, V> {
    questions: Q,
    votes: V,
}

impl<Q, V> ResetSyncUseCase<Q, V>
where
    Q: QuestionRepository,
    V: VoteRepository,
{
    pub fn new(questions: Q, votes: V) -> Self {
        Self { questions, votes }
    }

    pub async fn execute(&self) -> Result<ResetReport> {
        let mut report = ResetReport::default();

        for mut question in self.questions.list_all().await? {
            if !question.is_synced {
                continue;
            }
            question.is_synced = false;
            question.external_id = None;
            question.tx_hash = None;
            self.questions.save(question).await?;
            report.questions += 1;
        }

        report.votes = self.votes.clear().await?;
        tracing::info!(
            "Reset {} questions and deleted {} ledger votes",
            report.questions,
            report.votes
        );
        Ok(report)
    }
}
