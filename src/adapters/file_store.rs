use crate::adapters::memory::LedgerTables;
use crate::domain::model::{Question, SaveOutcome, Vote};
use crate::domain::ports::{QuestionRepository, Storage, VoteRepository};
use crate::utils::error::{ReconcileError, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Repository adapter that keeps the tables in memory and writes a JSON
/// snapshot through a [`Storage`] after every mutation.
pub struct FileStore<S: Storage> {
    storage: S,
    file_name: String,
    tables: Mutex<LedgerTables>,
}

impl<S: Storage> FileStore<S> {
    /// Loads `file_name` from storage; a missing file starts an empty ledger.
    pub async fn open(storage: S, file_name: impl Into<String>) -> Result<Self> {
        let file_name = file_name.into();

        let tables = match storage.read_file(&file_name).await {
            Ok(data) => {
                let mut tables: LedgerTables = serde_json::from_slice(&data)?;
                tables.rebuild_index();
                tracing::debug!(
                    "Loaded ledger snapshot '{}' ({} votes)",
                    file_name,
                    tables.vote_count()
                );
                tables
            }
            Err(ReconcileError::Storage(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No ledger snapshot at '{}', starting empty", file_name);
                LedgerTables::new()
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            storage,
            file_name,
            tables: Mutex::new(tables),
        })
    }

    async fn write_snapshot(&self, tables: &LedgerTables) -> Result<()> {
        let data = serde_json::to_vec_pretty(tables)?;
        self.storage.write_file(&self.file_name, &data).await?;
        tracing::debug!("Wrote ledger snapshot ({} bytes)", data.len());
        Ok(())
    }

    /// Applies `change` to a copy of the tables and only commits it once the
    /// snapshot has been written.
    async fn mutate<T, F>(&self, change: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(&mut LedgerTables) -> Result<T> + Send,
    {
        let mut tables = self.tables.lock().await;
        let mut next = tables.clone();
        let value = change(&mut next)?;

        self.write_snapshot(&next).await?;
        *tables = next;
        Ok(value)
    }
}

#[async_trait]
impl<S: Storage> QuestionRepository for FileStore<S> {
    async fn get_by_id(&self, question_id: u64) -> Result<Option<Question>> {
        Ok(self.tables.lock().await.question(question_id))
    }

    async fn get_by_external_id(&self, external_id: u64) -> Result<Option<Question>> {
        Ok(self.tables.lock().await.question_by_external_id(external_id))
    }

    async fn save(&self, question: Question) -> Result<Question> {
        self.mutate(|tables| tables.save_question(question)).await
    }

    async fn list_pending_sync(&self) -> Result<Vec<Question>> {
        Ok(self.tables.lock().await.pending_sync())
    }

    async fn list_all(&self) -> Result<Vec<Question>> {
        Ok(self.tables.lock().await.all_questions())
    }
}

#[async_trait]
impl<S: Storage> VoteRepository for FileStore<S> {
    async fn save(&self, vote: Vote) -> Result<SaveOutcome> {
        let mut tables = self.tables.lock().await;
        // 重複的鍵不改變任何資料，不需要重寫快照
        if tables.has_vote(&vote.tx_hash, vote.log_index) {
            return Ok(SaveOutcome::Duplicate);
        }

        let mut next = tables.clone();
        let outcome = next.insert_vote(vote);
        self.write_snapshot(&next).await?;
        *tables = next;
        Ok(outcome)
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
        self.mutate(|tables| Ok(tables.clear_votes())).await
    }
}
