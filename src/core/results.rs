use crate::core::{QuestionRepository, VoteRepository};
use crate::domain::model::{ChoiceResult, QuestionResults};
use crate::utils::error::{ReconcileError, Result};

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = count as f64 / total as f64 * 100.0;
    // 與十進位捨入一致：剛好落在中間時取偶數
    (raw * 10.0).round_ties_even() / 10.0
}

/// Tallies stored votes per choice index for one question.
pub struct GetQuestionResultsUseCase<Q, V> {
    questions: Q,
    votes: V,
}

impl<Q, V> GetQuestionResultsUseCase<Q, V>
where
    Q: QuestionRepository,
    V: VoteRepository,
{
    pub fn new(questions: Q, votes: V) -> Self {
        Self { questions, votes }
    }

    pub async fn execute(&self, question_id: u64) -> Result<QuestionResults> {
        let question = self
            .questions
            .get_by_id(question_id)
            .await?
            .ok_or(ReconcileError::NotFound { question_id })?;

        let votes = self.votes.list_for_question(question_id).await?;

        let mut counts = vec![0u64; question.choices.len()];
        let mut total_votes = 0u64;
        for vote in &votes {
            // 超出範圍的選項索引不列入計算
            if let Some(count) = usize::try_from(vote.choice_index)
                .ok()
                .and_then(|index| counts.get_mut(index))
            {
                *count += 1;
                total_votes += 1;
            }
        }

        let choices = question
            .choices
            .iter()
            .zip(&counts)
            .map(|(choice, &count)| ChoiceResult {
                text: choice.text.clone(),
                votes: count,
                percentage: percentage(count, total_votes),
            })
            .collect();

        Ok(QuestionResults {
            question_text: question.text,
            total_votes,
            choices,
            is_synced: question.is_synced,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryStore;
    use crate::domain::model::{Choice, Question, Vote};
    use std::sync::Arc;

    async fn store_with_question() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        let mut question = Question::new("Test?", vec![Choice::new("A"), Choice::new("B")]);
        question.id = Some(1);
        question.external_id = Some(10);
        question.is_synced = true;
        QuestionRepository::save(&store, question).await.unwrap();
        store
    }

    async fn add_vote(store: &InMemoryStore, choice_index: u64, log_index: u64) {
        VoteRepository::save(
            store,
            Vote {
                question_id: 1,
                choice_index,
                voter_address: format!("0x{}", log_index),
                tx_hash: format!("0x{}", log_index),
                block_number: 1,
                log_index,
                timestamp: None,
            },
        )
        .await
        .unwrap();
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(4, 4), 100.0);
    }

    #[test]
    fn test_percentage_ties_round_to_even() {
        assert_eq!(percentage(1, 16), 6.2);
        assert_eq!(percentage(5, 16), 31.2);
        assert_eq!(percentage(9, 16), 56.2);
        assert_eq!(percentage(3, 16), 18.8);
        assert_eq!(percentage(1, 8), 12.5);
    }

    #[tokio::test]
    async fn test_get_results_no_votes() {
        let store = store_with_question().await;

        let results = GetQuestionResultsUseCase::new(store.clone(), store)
            .execute(1)
            .await
            .unwrap();

        assert_eq!(results.total_votes, 0);
        assert_eq!(results.choices.len(), 2);
        assert_eq!(results.choices[0].votes, 0);
        assert_eq!(results.choices[1].percentage, 0.0);
        assert!(results.is_synced);
    }

    #[tokio::test]
    async fn test_get_results_with_votes() {
        let store = store_with_question().await;
        for i in 0..3 {
            add_vote(&store, 0, i).await;
        }
        add_vote(&store, 1, 999).await;

        let results = GetQuestionResultsUseCase::new(store.clone(), store)
            .execute(1)
            .await
            .unwrap();

        assert_eq!(results.question_text, "Test?");
        assert_eq!(results.total_votes, 4);
        assert_eq!(results.choices[0].text, "A");
        assert_eq!(results.choices[0].votes, 3);
        assert_eq!(results.choices[0].percentage, 75.0);
        assert_eq!(results.choices[1].votes, 1);
        assert_eq!(results.choices[1].percentage, 25.0);
    }

    #[tokio::test]
    async fn test_out_of_range_votes_are_excluded() {
        let store = store_with_question().await;
        add_vote(&store, 0, 1).await;
        add_vote(&store, 5, 2).await;

        let results = GetQuestionResultsUseCase::new(store.clone(), store)
            .execute(1)
            .await
            .unwrap();

        assert_eq!(results.total_votes, 1);
        assert_eq!(results.choices[0].percentage, 100.0);
    }

    #[tokio::test]
    async fn test_get_results_question_not_found() {
        let store = Arc::new(InMemoryStore::new());

        let result = GetQuestionResultsUseCase::new(store.clone(), store)
            .execute(999)
            .await;

        assert!(matches!(
            result,
            Err(ReconcileError::NotFound { question_id: 999 })
        ));
    }
}
