use serde::{Deserialize, Serialize};

use crate::entity::Product;
use crate::state::RawOperation;

pub const UNKNOWN: &str = "unknown";
pub const UNEXTRACTED_USER_MESSAGE: &str = "[Could not extract]";

/// The finalized, immutable output of one reconstruction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedExchange {
    pub conversation_id: String,
    pub message_id: Option<String>,
    pub model: String,
    pub user_message: String,
    pub assistant_response: String,
    pub products: Option<Vec<Product>>,
    pub raw_operations: Vec<RawOperation>,
    /// Epoch milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<ExchangeDebug>,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeDebug {
    pub url: Option<String>,
    pub request_action: Option<String>,
    pub parent_message_id: Option<String>,
}
