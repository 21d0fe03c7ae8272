use alloy::primitives::Address;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A recipient the user sent to before.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentRecipient {
    /// Unix timestamp in milliseconds at which the recipient was first used.
    pub id: i64,
    /// The text the user entered: an address or a name.
    pub name: String,
}

impl RecentRecipient {
    /// Creates an entry stamped with the current time.
    pub fn new(name: impl Into<String>) -> Self {
        Self { id: Utc::now().timestamp_millis(), name: name.into() }
    }

    /// Whether this entry names the same recipient, ignoring case.
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.trim())
    }
}

/// How a recipient input is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipientInput {
    /// A syntactically valid address.
    Address(Address),
    /// Anything else, resolved through the chain's name service.
    Name(String),
}

impl RecipientInput {
    /// Classifies user input.
    ///
    /// Hex addresses in a single case are accepted as-is. Mixed-case addresses must carry a
    /// valid checksum, otherwise the input is treated as a name.
    pub fn classify(input: &str) -> Self {
        let input = input.trim();
        match parse_address(input) {
            Some(address) => Self::Address(address),
            None => Self::Name(input.to_string()),
        }
    }
}

fn parse_address(input: &str) -> Option<Address> {
    let hex = input.strip_prefix("0x").or_else(|| input.strip_prefix("0X"))?;
    if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let has_lower = hex.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = hex.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        Address::parse_checksummed(format!("0x{hex}"), None).ok()
    } else {
        Address::from_str(hex).ok()
    }
}
