use crate::adapters::abi::{self, QUESTION_CREATED_EVENT, VOTE_CAST_EVENT};
use crate::adapters::rpc::LedgerConnection;
use crate::domain::model::{SubmitOutcome, VoteEvent};
use crate::domain::ports::LedgerGateway;
use crate::utils::error::{ReconcileError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    #[serde(default)]
    topics: Vec<String>,
    transaction_hash: Option<String>,
    block_number: Option<String>,
    log_index: Option<String>,
    #[serde(default)]
    removed: bool,
}

#[derive(Debug, Deserialize)]
struct RpcReceipt {
    #[serde(default)]
    logs: Vec<RpcLog>,
    status: Option<String>,
}

fn required<'a>(field: &str, value: &'a Option<String>) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| ReconcileError::invalid_response(format!("log is missing {}", field)))
}

fn decode_vote_log(log: &RpcLog) -> Result<VoteEvent> {
    if log.topics.len() < 4 {
        return Err(ReconcileError::invalid_response(format!(
            "VoteCast log has {} topics, expected 4",
            log.topics.len()
        )));
    }

    Ok(VoteEvent {
        external_question_id: abi::topic_to_u64(&log.topics[1])?,
        choice_index: abi::topic_to_u64(&log.topics[2])?,
        voter: abi::topic_to_address(&log.topics[3])?,
        tx_hash: required("transactionHash", &log.transaction_hash)?.to_string(),
        block_number: abi::parse_quantity(required("blockNumber", &log.block_number)?)?,
        log_index: abi::parse_quantity(required("logIndex", &log.log_index)?)?,
    })
}

/// Gateway to the voting contract on an Ethereum-compatible node.
///
/// Transactions are sent with `eth_sendTransaction`, so signing is left to
/// the node (for example an unlocked development account).
pub struct JsonRpcLedgerGateway {
    connection: LedgerConnection,
    contract_address: String,
    sender: Option<String>,
    vote_cast_topic: String,
    question_created_topic: String,
}

impl JsonRpcLedgerGateway {
    pub fn new(
        connection: LedgerConnection,
        contract_address: impl Into<String>,
        sender: Option<String>,
    ) -> Self {
        Self {
            connection,
            contract_address: contract_address.into(),
            sender,
            vote_cast_topic: abi::event_topic(VOTE_CAST_EVENT),
            question_created_topic: abi::event_topic(QUESTION_CREATED_EVENT),
        }
    }

    async fn try_fetch_vote_events(&self, from_block: u64) -> Result<Vec<VoteEvent>> {
        let filter = json!({
            "fromBlock": abi::to_quantity(from_block),
            "toBlock": "latest",
            "address": self.contract_address,
            "topics": [self.vote_cast_topic],
        });
        let logs: Vec<RpcLog> = self.connection.call("eth_getLogs", json!([filter])).await?;

        let mut events = Vec::with_capacity(logs.len());
        for log in logs.iter().filter(|log| !log.removed) {
            match decode_vote_log(log) {
                Ok(event) => events.push(event),
                Err(e) => tracing::warn!("Skipping malformed VoteCast log: {}", e),
            }
        }
        Ok(events)
    }

    async fn resolve_sender(&self) -> Result<String> {
        if let Some(sender) = &self.sender {
            return Ok(sender.clone());
        }
        let accounts: Vec<String> = self.connection.call("eth_accounts", json!([])).await?;
        accounts.into_iter().next().ok_or_else(|| ReconcileError::MissingConfig {
            field: "ledger.sender".to_string(),
        })
    }

    async fn try_submit_question(&self, text: &str, choices: &[String]) -> Result<SubmitOutcome> {
        let sender = self.resolve_sender().await?;
        let data = abi::encode_create_question(text, choices);

        let tx_hash: String = self
            .connection
            .call(
                "eth_sendTransaction",
                json!([{
                    "from": sender,
                    "to": self.contract_address,
                    "data": format!("0x{}", hex::encode(data)),
                }]),
            )
            .await?;
        tracing::info!("Submitted question transaction {}", tx_hash);

        // 回執可能尚未產生，此時外部 id 稍後才會確認
        let Some(receipt) = self.fetch_receipt(&tx_hash).await? else {
            tracing::info!("Receipt for {} not available yet", tx_hash);
            return Ok(SubmitOutcome::submitted(tx_hash, None));
        };

        if receipt.status.as_deref() == Some("0x0") {
            return Ok(SubmitOutcome {
                tx_hash: Some(tx_hash),
                ..SubmitOutcome::failed("transaction reverted")
            });
        }

        let external_id = self.created_question_id(&receipt)?;
        Ok(SubmitOutcome::submitted(tx_hash, external_id))
    }

    async fn fetch_receipt(&self, tx_hash: &str) -> Result<Option<RpcReceipt>> {
        self.connection
            .call("eth_getTransactionReceipt", json!([tx_hash]))
            .await
    }

    /// Reads the id from the `QuestionCreated` log of a receipt.
    fn created_question_id(&self, receipt: &RpcReceipt) -> Result<Option<u64>> {
        receipt
            .logs
            .iter()
            .find(|log| {
                log.topics
                    .first()
                    .is_some_and(|t| t.eq_ignore_ascii_case(&self.question_created_topic))
            })
            .and_then(|log| log.topics.get(1))
            .map(|topic| abi::topic_to_u64(topic))
            .transpose()
    }

    async fn try_lookup_question(&self, tx_hash: &str) -> Result<Option<u64>> {
        match self.fetch_receipt(tx_hash).await? {
            Some(receipt) if receipt.status.as_deref() != Some("0x0") => {
                self.created_question_id(&receipt)
            }
            Some(_) => {
                tracing::warn!("Question transaction {} was reverted", tx_hash);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl LedgerGateway for JsonRpcLedgerGateway {
    async fn fetch_vote_events(&self, from_block: u64) -> Vec<VoteEvent> {
        match self.try_fetch_vote_events(from_block).await {
            Ok(events) => {
                tracing::info!(
                    "Fetched {} vote events from block {}",
                    events.len(),
                    from_block
                );
                events
            }
            Err(e) => {
                tracing::error!("Error fetching vote events: {}", e);
                Vec::new()
            }
        }
    }

    async fn submit_question(&self, text: &str, choices: &[String]) -> SubmitOutcome {
        match self.try_submit_question(text, choices).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Error creating question on ledger: {}", e);
                SubmitOutcome::failed(e.to_string())
            }
        }
    }

    async fn current_block(&self) -> u64 {
        let block = self
            .connection
            .call::<String>("eth_blockNumber", json!([]))
            .await
            .and_then(|quantity| abi::parse_quantity(&quantity));
        match block {
            Ok(block) => block,
            Err(e) => {
                tracing::warn!("Could not read current block: {}", e);
                0
            }
        }
    }

    async fn lookup_question(&self, tx_hash: &str) -> Option<u64> {
        match self.try_lookup_question(tx_hash).await {
            Ok(external_id) => external_id,
            Err(e) => {
                tracing::error!("Error reading receipt for {}: {}", tx_hash, e);
                None
            }
        }
    }
}
