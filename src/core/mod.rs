pub mod publish;
pub mod reconciler;
pub mod reset;
pub mod results;
pub mod sync;

pub use crate::domain::model::{Question, QuestionResults, SyncReport, Vote, VoteEvent};
pub use crate::domain::ports::{LedgerGateway, QuestionRepository, Storage, VoteRepository};
pub use crate::utils::error::Result;
