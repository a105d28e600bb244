//! Transaction record
//!
//! A transfer of whole coins from one party to another. Transactions carry
//! no signature; the only requirement is that all three fields are present,
//! which the API boundary enforces before a transaction reaches the ledger.

use serde::{Deserialize, Serialize};

/// Sender used for mining rewards, signifying newly minted coins
pub const REWARD_SENDER: &str = "0";

/// Coins awarded to the node that forges a block
pub const MINING_REWARD: u64 = 1;

/// A pending or committed transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
}

impl Transaction {
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: u64) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        }
    }

    /// Create the reward transaction paid to a miner
    pub fn reward(recipient: impl Into<String>) -> Self {
        Self::new(REWARD_SENDER, recipient, MINING_REWARD)
    }

    /// Whether this transaction mints coins
    pub fn is_reward(&self) -> bool {
        self.sender == REWARD_SENDER
    }

    /// Canonical encoding used inside block hashes
    ///
    /// Keys appear in lexicographic order: `amount`, `recipient`, `sender`.
    pub fn canonical_json(&self) -> String {
        format!(
            r#"{{"amount":{},"recipient":{},"sender":{}}}"#,
            self.amount,
            json_string(&self.recipient),
            json_string(&self.sender)
        )
    }
}

/// JSON-escape a string, including the surrounding quotes
pub(crate) fn json_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_transaction() {
        let tx = Transaction::reward("node-1");
        assert!(tx.is_reward());
        assert_eq!(tx.amount, MINING_REWARD);
        assert_eq!(tx.recipient, "node-1");
    }

    #[test]
    fn test_canonical_json_orders_keys() {
        let tx = Transaction::new("A", "B", 5);
        assert_eq!(
            tx.canonical_json(),
            r#"{"amount":5,"recipient":"B","sender":"A"}"#
        );
    }

    #[test]
    fn test_canonical_json_escapes_strings() {
        let tx = Transaction::new("a\"b", "c\\d", 1);
        assert_eq!(
            tx.canonical_json(),
            r#"{"amount":1,"recipient":"c\\d","sender":"a\"b"}"#
        );
    }
}
