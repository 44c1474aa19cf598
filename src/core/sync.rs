use crate::core::{LedgerGateway, QuestionRepository, VoteRepository};
use crate::domain::model::{SaveOutcome, SyncReport, Vote, VoteEvent};
use crate::utils::error::Result;

enum MergeOutcome {
    Synced,
    Duplicate,
    Unmatched,
}

/// Merges `VoteCast` events from the ledger into the local vote ledger.
///
/// Idempotent: events are keyed by `(tx_hash, log_index)`, so replaying a
/// range never adds a vote twice. Events whose external question id has no
/// local question are skipped, and choice indices are stored unchecked.
pub struct SyncVotesUseCase<V, Q, G> {
    votes: V,
    questions: Q,
    gateway: G,
}

impl<V, Q, G> SyncVotesUseCase<V, Q, G>
where
    V: VoteRepository,
    Q: QuestionRepository,
    G: LedgerGateway,
{
    pub fn new(votes: V, questions: Q, gateway: G) -> Self {
        Self {
            votes,
            questions,
            gateway,
        }
    }

    /// Returns the number of newly persisted votes.
    pub async fn execute(&self, from_block: u64) -> usize {
        self.run(from_block).await.synced
    }

    pub async fn run(&self, from_block: u64) -> SyncReport {
        tracing::info!("Starting vote sync from block {}", from_block);

        let events = self.gateway.fetch_vote_events(from_block).await;
        let mut report = SyncReport {
            fetched: events.len(),
            ..SyncReport::default()
        };

        for event in &events {
            match self.merge_event(event).await {
                Ok(MergeOutcome::Synced) => report.synced += 1,
                Ok(MergeOutcome::Duplicate) => report.duplicates += 1,
                Ok(MergeOutcome::Unmatched) => report.unmatched += 1,
                Err(e) => {
                    tracing::error!(
                        "Failed to merge vote {}-{}: {}",
                        event.tx_hash,
                        event.log_index,
                        e
                    );
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            "Vote sync finished: {} fetched, {} new, {} duplicate, {} unmatched, {} failed",
            report.fetched,
            report.synced,
            report.duplicates,
            report.unmatched,
            report.failed
        );
        report
    }

    async fn merge_event(&self, event: &VoteEvent) -> Result<MergeOutcome> {
        // 冪等檢查（快速路徑，真正的保證在儲存層）
        if self.votes.exists(&event.tx_hash, event.log_index).await? {
            tracing::debug!(
                "Vote {}-{} already exists. Skipping.",
                event.tx_hash,
                event.log_index
            );
            return Ok(MergeOutcome::Duplicate);
        }

        let question = self
            .questions
            .get_by_external_id(event.external_question_id)
            .await?;
        let Some(question_id) = question.and_then(|q| q.id) else {
            tracing::warn!(
                "Question with external id {} not found locally. Skipping vote.",
                event.external_question_id
            );
            return Ok(MergeOutcome::Unmatched);
        };

        let vote = Vote {
            question_id,
            choice_index: event.choice_index,
            voter_address: event.voter.clone(),
            tx_hash: event.tx_hash.clone(),
            block_number: event.block_number,
            log_index: event.log_index,
            timestamp: None,
        };

        match self.votes.save(vote).await? {
            SaveOutcome::Inserted => {
                tracing::info!(
                    "Synced new vote for question {} from {}",
                    question_id,
                    event.voter
                );
                Ok(MergeOutcome::Synced)
            }
            SaveOutcome::Duplicate => {
                tracing::debug!(
                    "Vote {}-{} was stored concurrently. Skipping.",
                    event.tx_hash,
                    event.log_index
                );
                Ok(MergeOutcome::Duplicate)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryStore, MockLedgerGateway};
    use crate::domain::model::{Choice, Question};
    use crate::utils::error::ReconcileError;
    use async_trait::async_trait;
    use std::sync::Arc;

    async fn store_with_question(external_id: u64) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        let mut question = Question::new(
            "Favourite colour?",
            vec![Choice::new("Red"), Choice::new("Blue")],
        );
        question.id = Some(1);
        question.external_id = Some(external_id);
        question.is_synced = true;
        QuestionRepository::save(&store, question).await.unwrap();
        store
    }

    fn use_case(
        store: &Arc<InMemoryStore>,
        gateway: &Arc<MockLedgerGateway>,
    ) -> SyncVotesUseCase<Arc<InMemoryStore>, Arc<InMemoryStore>, Arc<MockLedgerGateway>> {
        SyncVotesUseCase::new(store.clone(), store.clone(), gateway.clone())
    }

    #[tokio::test]
    async fn test_sync_votes_basic() {
        let store = store_with_question(10).await;
        let gateway = Arc::new(MockLedgerGateway::new());
        gateway.add_vote_event(10, 0, "0xabc123def456", None);

        let count = use_case(&store, &gateway).execute(0).await;

        let votes = store.votes().await;
        assert_eq!(count, 1);
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].question_id, 1);
        assert_eq!(votes[0].voter_address, "0xabc123def456");
        assert_eq!(votes[0].choice_index, 0);
    }

    #[tokio::test]
    async fn test_sync_votes_idempotency() {
        let store = store_with_question(10).await;
        let gateway = Arc::new(MockLedgerGateway::new());
        gateway.add_vote_event(10, 0, "0xabc", Some("0x123abc"));
        let sync = use_case(&store, &gateway);

        let first = sync.execute(0).await;
        let after_first = store.votes().await;
        let second = sync.execute(0).await;

        assert_eq!(first, 1);
        assert_eq!(second, 0);
        assert_eq!(store.votes().await, after_first);
    }

    #[tokio::test]
    async fn test_sync_votes_missing_question() {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(MockLedgerGateway::new());
        gateway.add_vote_event(999, 0, "0xabc", None);

        let report = use_case(&store, &gateway).run(0).await;

        assert_eq!(report.synced, 0);
        assert_eq!(report.unmatched, 1);
        assert!(store.votes().await.is_empty());
    }

    #[tokio::test]
    async fn test_sync_votes_multiple_events() {
        let store = store_with_question(10).await;
        let gateway = Arc::new(MockLedgerGateway::new());
        gateway.add_vote_event(10, 0, "0xaaa", None);
        gateway.add_vote_event(10, 1, "0xbbb", None);
        gateway.add_vote_event(10, 0, "0xccc", None);

        let count = use_case(&store, &gateway).execute(0).await;

        assert_eq!(count, 3);
        assert_eq!(store.votes().await.len(), 3);
    }

    #[tokio::test]
    async fn test_sync_votes_from_specific_block() {
        let store = store_with_question(10).await;
        let gateway = Arc::new(MockLedgerGateway::new());
        gateway.add_vote_event(10, 0, "0xaaa", None);
        gateway.add_vote_event(10, 1, "0xbbb", None);
        gateway.add_vote_event(10, 0, "0xccc", None);

        let count = use_case(&store, &gateway).execute(2).await;

        let blocks: Vec<u64> = store.votes().await.iter().map(|v| v.block_number).collect();
        assert_eq!(count, 2);
        assert_eq!(blocks, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_out_of_range_choice_is_still_stored() {
        let store = store_with_question(10).await;
        let gateway = Arc::new(MockLedgerGateway::new());
        gateway.add_vote_event(10, 7, "0xaaa", None);

        assert_eq!(use_case(&store, &gateway).execute(0).await, 1);
        assert_eq!(store.votes().await[0].choice_index, 7);
    }

    #[tokio::test]
    async fn test_mixed_batch_keeps_going() {
        let store = store_with_question(10).await;
        let gateway = Arc::new(MockLedgerGateway::new());
        gateway.add_vote_event(10, 0, "0xaaa", Some("0x01"));
        gateway.add_vote_event(42, 0, "0xbbb", None);
        gateway.add_vote_event(10, 1, "0xccc", None);
        // 同一筆交易重播
        gateway.add_vote_event(10, 0, "0xaaa", Some("0x01"));

        let report = use_case(&store, &gateway).run(0).await;

        assert_eq!(
            report,
            SyncReport {
                fetched: 4,
                synced: 2,
                duplicates: 1,
                unmatched: 1,
                failed: 0,
            }
        );
    }

    /// Reports every vote as missing so the storage constraint is exercised.
    struct RacingVotes(Arc<InMemoryStore>);

    #[async_trait]
    impl VoteRepository for RacingVotes {
        async fn save(&self, vote: Vote) -> Result<SaveOutcome> {
            VoteRepository::save(&self.0, vote).await
        }

        async fn exists(&self, _tx_hash: &str, _log_index: u64) -> Result<bool> {
            Ok(false)
        }

        async fn list_for_question(&self, question_id: u64) -> Result<Vec<Vote>> {
            self.0.list_for_question(question_id).await
        }

        async fn count(&self) -> Result<usize> {
            self.0.count().await
        }

        async fn clear(&self) -> Result<usize> {
            self.0.clear().await
        }
    }

    #[tokio::test]
    async fn test_storage_constraint_turns_race_into_no_op() {
        let store = store_with_question(10).await;
        let gateway = Arc::new(MockLedgerGateway::new());
        gateway.add_vote_event(10, 0, "0xabc", Some("0x123"));
        let sync =
            SyncVotesUseCase::new(RacingVotes(store.clone()), store.clone(), gateway.clone());

        assert_eq!(sync.execute(0).await, 1);
        let report = sync.run(0).await;

        assert_eq!(report.synced, 0);
        assert_eq!(report.duplicates, 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    struct BrokenVotes;

    #[async_trait]
    impl VoteRepository for BrokenVotes {
        async fn save(&self, _vote: Vote) -> Result<SaveOutcome> {
            Err(ReconcileError::Storage(std::io::Error::other("disk full")))
        }

        async fn exists(&self, _tx_hash: &str, _log_index: u64) -> Result<bool> {
            Ok(false)
        }

        async fn list_for_question(&self, _question_id: u64) -> Result<Vec<Vote>> {
            Ok(Vec::new())
        }

        async fn count(&self) -> Result<usize> {
            Ok(0)
        }

        async fn clear(&self) -> Result<usize> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_storage_failure_is_counted_not_raised() {
        let store = store_with_question(10).await;
        let gateway = Arc::new(MockLedgerGateway::new());
        gateway.add_vote_event(10, 0, "0xaaa", None);
        gateway.add_vote_event(10, 1, "0xbbb", None);

        let report = SyncVotesUseCase::new(BrokenVotes, store, gateway).run(0).await;

        assert_eq!(report.synced, 0);
        assert_eq!(report.failed, 2);
    }
}
