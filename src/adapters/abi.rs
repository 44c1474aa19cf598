//! Minimal Ethereum ABI and JSON-RPC quantity helpers for the voting contract.
//!
//! Only what the gateway needs: event topics, the `createQuestion` call
//! encoding and decoding of indexed `uint256`/`address` topics.

use crate::utils::error::{ReconcileError, Result};
use sha3::{Digest, Keccak256};

pub const VOTE_CAST_EVENT: &str = "VoteCast(uint256,uint256,address)";
pub const QUESTION_CREATED_EVENT: &str = "QuestionCreated(uint256,string)";
pub const CREATE_QUESTION_FN: &str = "createQuestion(string,string[])";

const WORD: usize = 32;

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// `topics[0]` of an event, as a 0x-prefixed hex string.
pub fn event_topic(signature: &str) -> String {
    format!("0x{}", hex::encode(keccak256(signature.as_bytes())))
}

pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn word(value: usize) -> [u8; WORD] {
    let mut out = [0u8; WORD];
    out[WORD - 8..].copy_from_slice(&(value as u64).to_be_bytes());
    out
}

fn encode_string(value: &str) -> Vec<u8> {
    let bytes = value.as_bytes();
    let padded_len = bytes.len().div_ceil(WORD) * WORD;

    let mut out = Vec::with_capacity(WORD + padded_len);
    out.extend_from_slice(&word(bytes.len()));
    out.extend_from_slice(bytes);
    out.resize(WORD + padded_len, 0);
    out
}

fn encode_string_array(values: &[String]) -> Vec<u8> {
    let elements: Vec<Vec<u8>> = values.iter().map(|v| encode_string(v)).collect();

    let mut out = word(values.len()).to_vec();
    // 元素 offset 相對於 offset 區塊的起點
    let mut offset = WORD * values.len();
    for element in &elements {
        out.extend_from_slice(&word(offset));
        offset += element.len();
    }
    for element in elements {
        out.extend(element);
    }
    out
}

/// Calldata for `createQuestion(string,string[])`.
pub fn encode_create_question(text: &str, choices: &[String]) -> Vec<u8> {
    let text_enc = encode_string(text);
    let choices_enc = encode_string_array(choices);

    let mut data = function_selector(CREATE_QUESTION_FN).to_vec();
    data.extend_from_slice(&word(2 * WORD));
    data.extend_from_slice(&word(2 * WORD + text_enc.len()));
    data.extend(text_enc);
    data.extend(choices_enc);
    data
}

fn topic_bytes(topic: &str) -> Result<[u8; 32]> {
    let digits = topic.strip_prefix("0x").unwrap_or(topic);
    let bytes = hex::decode(digits)
        .map_err(|e| ReconcileError::invalid_response(format!("bad topic '{}': {}", topic, e)))?;
    bytes
        .try_into()
        .map_err(|_| ReconcileError::invalid_response(format!("topic '{}' is not 32 bytes", topic)))
}

/// Decodes an indexed `uint256` topic that must fit in a `u64`.
pub fn topic_to_u64(topic: &str) -> Result<u64> {
    let bytes = topic_bytes(topic)?;
    if bytes[..WORD - 8].iter().any(|b| *b != 0) {
        return Err(ReconcileError::invalid_response(format!(
            "topic '{}' overflows u64",
            topic
        )));
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&bytes[WORD - 8..]);
    Ok(u64::from_be_bytes(low))
}

/// Decodes an indexed `address` topic (last 20 bytes).
pub fn topic_to_address(topic: &str) -> Result<String> {
    let bytes = topic_bytes(topic)?;
    Ok(format!("0x{}", hex::encode(&bytes[12..])))
}

/// Parses a JSON-RPC quantity such as `"0x1a"`.
pub fn parse_quantity(value: &str) -> Result<u64> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| ReconcileError::invalid_response(format!("quantity '{}' lacks 0x", value)))?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| ReconcileError::invalid_response(format!("bad quantity '{}': {}", value, e)))
}

pub fn to_quantity(value: u64) -> String {
    format!("0x{:x}", value)
}
