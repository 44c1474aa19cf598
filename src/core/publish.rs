use crate::core::{LedgerGateway, QuestionRepository};
use crate::domain::model::{PublishReport, Question};
use crate::utils::error::{ReconcileError, Result};

/// The voting contract rejects questions with fewer choices than this.
pub const MIN_LEDGER_CHOICES: usize = 2;

/// Creates pending questions on the ledger and links them to their
/// external id.
///
/// A question submitted before its receipt was available stays synced
/// without an external id; later runs look the receipt up again until the
/// id is known.
pub struct PublishPendingQuestionsUseCase<Q, G> {
    questions: Q,
    gateway: G,
}

impl<Q, G> PublishPendingQuestionsUseCase<Q, G>
where
    Q: QuestionRepository,
    G: LedgerGateway,
{
    pub fn new(questions: Q, gateway: G) -> Self {
        Self { questions, gateway }
    }

    pub async fn execute(&self) -> Result<PublishReport> {
        let mut report = PublishReport::default();

        let unconfirmed: Vec<Question> = self
            .questions
            .list_all()
            .await?
            .into_iter()
            .filter(is_unconfirmed)
            .collect();
        for question in unconfirmed {
            self.confirm(question, &mut report).await;
        }

        let pending = self.questions.list_pending_sync().await?;
        if pending.is_empty() {
            tracing::info!("All questions are already synced");
        }
        for question in pending {
            self.submit(question, &mut report).await;
        }

        Ok(report)
    }

    /// Publishes one question, or confirms it if an earlier submission is
    /// still waiting for its external id.
    pub async fn execute_one(&self, question_id: u64) -> Result<PublishReport> {
        let question = self
            .questions
            .get_by_id(question_id)
            .await?
            .ok_or(ReconcileError::NotFound { question_id })?;
        let mut report = PublishReport::default();

        if is_unconfirmed(&question) {
            self.confirm(question, &mut report).await;
        } else if question.is_synced {
            tracing::warn!(
                "Question {} is already synced as external id {:?}",
                question_id,
                question.external_id
            );
        } else {
            self.submit(question, &mut report).await;
        }

        Ok(report)
    }

    async fn submit(&self, mut question: Question, report: &mut PublishReport) {
        if question.choices.len() < MIN_LEDGER_CHOICES {
            tracing::warn!(
                "Question {:?} has {} choices, at least {} are required on the ledger",
                question.id,
                question.choices.len(),
                MIN_LEDGER_CHOICES
            );
            report.failed += 1;
            return;
        }

        let outcome = self
            .gateway
            .submit_question(&question.text, &question.choice_texts())
            .await;

        if !outcome.success {
            tracing::warn!(
                "Failed to publish question {:?}: {}",
                question.id,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
            report.failed += 1;
            return;
        }

        question.is_synced = true;
        question.tx_hash = outcome.tx_hash;
        let confirmed = outcome.external_id.is_some();
        match outcome.external_id {
            Some(external_id) => question.external_id = Some(external_id),
            None => tracing::warn!(
                "Question {:?} submitted, external id pending confirmation",
                question.id
            ),
        }

        match self.questions.save(question).await {
            Ok(saved) => {
                tracing::info!(
                    "Published question {:?} as external id {:?}",
                    saved.id,
                    saved.external_id
                );
                report.submitted += 1;
                if !confirmed {
                    report.pending += 1;
                }
            }
            Err(e) => {
                tracing::error!("Failed to link published question: {}", e);
                report.failed += 1;
            }
        }
    }

    async fn confirm(&self, mut question: Question, report: &mut PublishReport) {
        let Some(tx_hash) = question.tx_hash.clone() else {
            return;
        };

        let Some(external_id) = self.gateway.lookup_question(&tx_hash).await else {
            tracing::info!(
                "Question {:?} still waiting for receipt of {}",
                question.id,
                tx_hash
            );
            report.pending += 1;
            return;
        };

        question.external_id = Some(external_id);
        match self.questions.save(question).await {
            Ok(saved) => {
                tracing::info!(
                    "Confirmed question {:?} as external id {}",
                    saved.id,
                    external_id
                );
                report.confirmed += 1;
            }
            Err(e) => {
                tracing::error!("Failed to link confirmed question: {}", e);
                report.failed += 1;
            }
        }
    }
}

fn is_unconfirmed(question: &Question) -> bool {
    question.is_synced && question.external_id.is_none() && question.tx_hash.is_some()
}
