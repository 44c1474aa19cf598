use crate::adapters::abi::keccak256;
use crate::domain::model::{SubmitOutcome, VoteEvent};
use crate::domain::ports::LedgerGateway;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MockLedgerState {
    events: Vec<VoteEvent>,
    block_number: u64,
    question_counter: u64,
    // tx hash -> external question id
    questions: HashMap<String, u64>,
}

/// In-process ledger used for tests and for running without a node.
///
/// Every added vote event mines a new block, so block numbers follow
/// insertion order (1, 2, 3, ...).
#[derive(Debug, Default)]
pub struct MockLedgerGateway {
    state: Mutex<MockLedgerState>,
}

fn fake_tx_hash(seed: &str) -> String {
    format!("0x{}", hex::encode(keccak256(seed.as_bytes())))
}

impl MockLedgerGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the ledger with recorded events; the block counter continues
    /// from the highest seeded block.
    pub fn from_events(events: Vec<VoteEvent>) -> Self {
        let block_number = events.iter().map(|e| e.block_number).max().unwrap_or(0);
        Self {
            state: Mutex::new(MockLedgerState {
                events,
                block_number,
                ..MockLedgerState::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockLedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_vote_event(
        &self,
        external_question_id: u64,
        choice_index: u64,
        voter: &str,
        tx_hash: Option<&str>,
    ) -> VoteEvent {
        let mut state = self.state();
        state.block_number += 1;
        let block_number = state.block_number;

        let event = VoteEvent {
            external_question_id,
            choice_index,
            voter: voter.to_string(),
            tx_hash: tx_hash.map(str::to_string).unwrap_or_else(|| {
                fake_tx_hash(&format!("vote:{}:{}:{}", block_number, external_question_id, voter))
            }),
            block_number,
            log_index: 0,
        };
        state.events.push(event.clone());
        event
    }

    pub fn events(&self) -> Vec<VoteEvent> {
        self.state().events.clone()
    }

    pub fn reset(&self) {
        *self.state() = MockLedgerState::default();
    }
}

#[async_trait]
impl LedgerGateway for MockLedgerGateway {
    async fn fetch_vote_events(&self, from_block: u64) -> Vec<VoteEvent> {
        let events: Vec<VoteEvent> = self
            .state()
            .events
            .iter()
            .filter(|e| e.block_number >= from_block)
            .cloned()
            .collect();
        tracing::debug!(
            "Mock ledger returned {} vote events from block {}",
            events.len(),
            from_block
        );
        events
    }

    async fn submit_question(&self, text: &str, choices: &[String]) -> SubmitOutcome {
        let mut state = self.state();
        state.question_counter += 1;
        let external_id = state.question_counter;
        let tx_hash = fake_tx_hash(&format!(
            "question:{}:{}:{}",
            external_id,
            text,
            choices.join("|")
        ));
        state.questions.insert(tx_hash.clone(), external_id);

        tracing::info!(
            "Mock ledger created question {} with {} choices",
            external_id,
            choices.len()
        );
        SubmitOutcome::submitted(tx_hash, Some(external_id))
    }

    async fn current_block(&self) -> u64 {
        self.state().block_number
    }

    async fn lookup_question(&self, tx_hash: &str) -> Option<u64> {
        self.state().questions.get(tx_hash).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_vote_events_empty() {
        let gateway = MockLedgerGateway::new();
        assert!(gateway.fetch_vote_events(0).await.is_empty());
        assert_eq!(gateway.current_block().await, 0);
    }

    #[tokio::test]
    async fn test_add_and_fetch_vote_events() {
        let gateway = MockLedgerGateway::new();
        gateway.add_vote_event(1, 0, "0xabc", None);
        gateway.add_vote_event(1, 1, "0xdef", None);

        let events = gateway.fetch_vote_events(0).await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].external_question_id, 1);
        assert_eq!(events[0].voter, "0xabc");
        assert_eq!(events[0].block_number, 1);
        assert_eq!(events[1].block_number, 2);
        assert_ne!(events[0].tx_hash, events[1].tx_hash);
        assert!(events[0].tx_hash.starts_with("0x"));
    }

    #[test]
    fn test_fetch_past_head_is_empty() {
        let gateway = MockLedgerGateway::new();
        gateway.add_vote_event(1, 0, "0xabc", None);

        let events = tokio_test::block_on(gateway.fetch_vote_events(5));
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_from_block_is_inclusive() {
        let gateway = MockLedgerGateway::new();
        for voter in ["0xaaa", "0xbbb", "0xccc"] {
            gateway.add_vote_event(10, 0, voter, None);
        }

        let events = gateway.fetch_vote_events(2).await;
        let blocks: Vec<u64> = events.iter().map(|e| e.block_number).collect();
        assert_eq!(blocks, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_create_question() {
        let gateway = MockLedgerGateway::new();

        let first = gateway
            .submit_question("Test?", &["A".to_string(), "B".to_string(), "C".to_string()])
            .await;
        let second = gateway.submit_question("Again?", &[]).await;

        assert!(first.success);
        assert_eq!(first.external_id, Some(1));
        assert!(first.tx_hash.as_deref().unwrap().starts_with("0x"));
        assert_eq!(second.external_id, Some(2));
        let first_tx = first.tx_hash.unwrap();
        assert_eq!(gateway.lookup_question(&first_tx).await, Some(1));
        assert_eq!(gateway.lookup_question("0xunknown").await, None);
        // 建立問題不會推進區塊
        assert_eq!(gateway.current_block().await, 0);
    }

    #[tokio::test]
    async fn test_reset_clears_state() {
        let gateway = MockLedgerGateway::new();
        gateway.add_vote_event(1, 0, "0xabc", None);
        gateway.submit_question("Test", &["A".to_string(), "B".to_string()]).await;

        gateway.reset();

        assert!(gateway.fetch_vote_events(0).await.is_empty());
        assert_eq!(gateway.current_block().await, 0);
        let outcome = gateway.submit_question("After reset", &[]).await;
        assert_eq!(outcome.external_id, Some(1));
    }

    #[tokio::test]
    async fn test_from_events_continues_block_counter() {
        let seeded = VoteEvent {
            external_question_id: 4,
            choice_index: 1,
            voter: "0x01".to_string(),
            tx_hash: "0xfeed".to_string(),
            block_number: 41,
            log_index: 2,
        };
        let gateway = MockLedgerGateway::from_events(vec![seeded.clone()]);

        let added = gateway.add_vote_event(4, 0, "0x02", Some("0xbeef"));

        assert_eq!(added.block_number, 42);
        assert_eq!(added.tx_hash, "0xbeef");
        assert_eq!(gateway.events(), vec![seeded, added]);
    }
}
