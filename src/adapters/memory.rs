use crate::domain::model::{Question, SaveOutcome, Vote};
use crate::domain::ports::{QuestionRepository, VoteRepository};
use crate::utils::error::{ReconcileError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::Mutex;

/// Question and vote tables shared by the memory and file stores.
///
/// The `(tx_hash, log_index)` index is the uniqueness constraint for votes;
/// `insert_vote` checks it under the same lock as the insert.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerTables {
    #[serde(default)]
    last_question_id: u64,
    #[serde(default)]
    last_choice_id: u64,
    #[serde(default)]
    questions: Vec<Question>,
    #[serde(default)]
    votes: Vec<Vote>,
    #[serde(skip)]
    vote_keys: HashSet<(String, u64)>,
}

impl LedgerTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// 從快照載入後重建索引
    pub fn rebuild_index(&mut self) {
        self.vote_keys = self
            .votes
            .iter()
            .map(|v| (v.tx_hash.clone(), v.log_index))
            .collect();
    }

    pub fn question(&self, question_id: u64) -> Option<Question> {
        self.questions
            .iter()
            .find(|q| q.id == Some(question_id))
            .cloned()
    }

    pub fn question_by_external_id(&self, external_id: u64) -> Option<Question> {
        self.questions
            .iter()
            .find(|q| q.external_id == Some(external_id))
            .cloned()
    }

    pub fn save_question(&mut self, mut question: Question) -> Result<Question> {
        if let Some(external_id) = question.external_id {
            if let Some(owner) = self
                .questions
                .iter()
                .find(|q| q.external_id == Some(external_id) && q.id != question.id)
            {
                return Err(ReconcileError::Conflict {
                    external_id,
                    question_id: owner.id.unwrap_or_default(),
                });
            }
        }

        let question_id = match question.id {
            Some(id) => {
                self.last_question_id = self.last_question_id.max(id);
                id
            }
            None => {
                self.last_question_id += 1;
                self.last_question_id
            }
        };
        question.id = Some(question_id);

        for choice in question.choices.iter_mut() {
            match choice.id {
                Some(id) => self.last_choice_id = self.last_choice_id.max(id),
                None => {
                    self.last_choice_id += 1;
                    choice.id = Some(self.last_choice_id);
                }
            }
        }

        match self
            .questions
            .iter_mut()
            .find(|q| q.id == Some(question_id))
        {
            Some(existing) => *existing = question.clone(),
            None => self.questions.push(question.clone()),
        }

        Ok(question)
    }

    pub fn pending_sync(&self) -> Vec<Question> {
        self.questions
            .iter()
            .filter(|q| !q.is_synced)
            .cloned()
            .collect()
    }

    pub fn all_questions(&self) -> Vec<Question> {
        self.questions.clone()
    }

    pub fn insert_vote(&mut self, vote: Vote) -> SaveOutcome {
        if !self.vote_keys.insert((vote.tx_hash.clone(), vote.log_index)) {
            return SaveOutcome::Duplicate;
        }
        self.votes.push(vote);
        SaveOutcome::Inserted
    }

    pub fn has_vote(&self, tx_hash: &str, log_index: u64) -> bool {
        self.vote_keys.contains(&(tx_hash.to_string(), log_index))
    }

    pub fn votes_for(&self, question_id: u64) -> Vec<Vote> {
        self.votes
            .iter()
            .filter(|v| v.question_id == question_id)
            .cloned()
            .collect()
    }

    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    pub fn clear_votes(&mut self) -> usize {
        self.vote_keys.clear();
        std::mem::take(&mut self.votes).len()
    }
}

/// Process-local store, used by tests and by offline runs.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<LedgerTables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn votes(&self) -> Vec<Vote> {
        self.tables.lock().await.votes.clone()
    }
}

#[async_trait]
impl QuestionRepository for InMemoryStore {
    async fn get_by_id(&self, question_id: u64) -> Result<Option<Question>> {
        Ok(self.tables.lock().await.question(question_id))
    }

    async fn get_by_external_id(&self, external_id: u64) -> Result<Option<Question>> {
        Ok(self.tables.lock().await.question_by_external_id(external_id))
    }

    async fn save(&self, question: Question) -> Result<Question> {
        self.tables.lock().await.save_question(question)
    }

    async fn list_pending_sync(&self) -> Result<Vec<Question>> {
        Ok(self.tables.lock().await.pending_sync())
    }

    async fn list_all(&self) -> Result<Vec<Question>> {
        Ok(self.tables.lock().await.all_questions())
    }
}

#[async_trait]
impl VoteRepository for InMemoryStore {
    async fn save(&self, vote: Vote) -> Result<SaveOutcome> {
        Ok(self.tables.lock().await.insert_vote(vote))
    }

    async fn exists(&self, tx_hash: &str, log_index: u64) -> Result<bool> {
        Ok(self.tables.lock().await.has_vote(tx_hash, log_index))
    }

    async fn list_for_question(&self, question_id: u64) -> Result<Vec<Vote>> {
        Ok(self.tables.lock().await.votes_for(question_id))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.tables.lock().await.vote_count())
    }

    async fn clear(&self) -> Result<usize> {
        Ok(self.tables.lock().await.clear_votes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Choice;

    fn vote(tx_hash: &str, log_index: u64) -> Vote {
        Vote {
            question_id: 1,
            choice_index: 0,
            voter_address: "0xabc".to_string(),
            tx_hash: tx_hash.to_string(),
            block_number: 1,
            log_index,
            timestamp: None,
        }
    }

    #[tokio::test]
    async fn test_save_assigns_ids() {
        let store = InMemoryStore::new();
        let question = Question::new(
            "Favourite colour?",
            vec![Choice::new("Red"), Choice::new("Blue")],
        );

        let saved = QuestionRepository::save(&store, question).await.unwrap();

        assert_eq!(saved.id, Some(1));
        assert_eq!(saved.choices[0].id, Some(1));
        assert_eq!(saved.choices[1].id, Some(2));

        let second = QuestionRepository::save(&store, Question::new("Second?", vec![]))
            .await
            .unwrap();
        assert_eq!(second.id, Some(2));
    }

    #[tokio::test]
    async fn test_save_keeps_explicit_id_and_updates() {
        let store = InMemoryStore::new();
        let mut question = Question::new("Test", vec![]);
        question.id = Some(7);

        let mut saved = QuestionRepository::save(&store, question).await.unwrap();
        assert_eq!(saved.id, Some(7));

        saved.is_synced = true;
        saved.external_id = Some(10);
        QuestionRepository::save(&store, saved).await.unwrap();

        let loaded = store.get_by_external_id(10).await.unwrap().unwrap();
        assert_eq!(loaded.id, Some(7));
        assert!(store.list_pending_sync().await.unwrap().is_empty());
        assert_eq!(store.list_all().await.unwrap().len(), 1);

        // 新問題接續在最大 id 之後
        let next = QuestionRepository::save(&store, Question::new("Next", vec![]))
            .await
            .unwrap();
        assert_eq!(next.id, Some(8));
    }

    #[tokio::test]
    async fn test_external_id_is_unique() {
        let store = InMemoryStore::new();
        let mut first = Question::new("First", vec![]);
        first.external_id = Some(10);
        QuestionRepository::save(&store, first).await.unwrap();

        let mut second = Question::new("Second", vec![]);
        second.external_id = Some(10);
        let result = QuestionRepository::save(&store, second).await;

        assert!(matches!(
            result,
            Err(ReconcileError::Conflict {
                external_id: 10,
                question_id: 1
            })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_vote_key_is_a_no_op() {
        let store = InMemoryStore::new();

        assert_eq!(
            VoteRepository::save(&store, vote("0x123", 0)).await.unwrap(),
            SaveOutcome::Inserted
        );
        assert_eq!(
            VoteRepository::save(&store, vote("0x123", 0)).await.unwrap(),
            SaveOutcome::Duplicate
        );
        // 同一筆交易的不同 log 是不同事件
        assert_eq!(
            VoteRepository::save(&store, vote("0x123", 1)).await.unwrap(),
            SaveOutcome::Inserted
        );

        assert_eq!(store.count().await.unwrap(), 2);
        assert!(store.exists("0x123", 1).await.unwrap());
        assert!(!store.exists("0x123", 2).await.unwrap());
    }

    #[test]
    fn test_rebuild_index_after_deserialize() {
        let mut tables = LedgerTables::new();
        tables.insert_vote(vote("0xaaa", 3));

        let json = serde_json::to_string(&tables).unwrap();
        let mut restored: LedgerTables = serde_json::from_str(&json).unwrap();
        assert!(!restored.has_vote("0xaaa", 3));

        restored.rebuild_index();
        assert!(restored.has_vote("0xaaa", 3));
        assert_eq!(restored.insert_vote(vote("0xaaa", 3)), SaveOutcome::Duplicate);
    }

    #[tokio::test]
    async fn test_clear_frees_vote_keys() {
        let store = InMemoryStore::new();
        VoteRepository::save(&store, vote("0x123", 0)).await.unwrap();
        VoteRepository::save(&store, vote("0x456", 0)).await.unwrap();

        assert_eq!(store.clear().await.unwrap(), 2);
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(!store.exists("0x123", 0).await.unwrap());
        assert_eq!(
            VoteRepository::save(&store, vote("0x123", 0)).await.unwrap(),
            SaveOutcome::Inserted
        );
    }
}
