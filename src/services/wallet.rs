//! Wallet address format checks.
//!
//! Pure pattern matching, no network calls. Without a network hint the
//! patterns are tried in declaration order and the first match wins, so a
//! hex40 address always classifies as BEP20 even though ERC20 and Arbitrum
//! accept the same shape. Address formats are shared across EVM chains and
//! there is no way to tell them apart from the string alone.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WalletNetwork {
    #[serde(rename = "BEP20")]
    Bep20,
    #[serde(rename = "ERC20")]
    Erc20,
    #[serde(rename = "TRC20")]
    Trc20,
    #[serde(rename = "BTC")]
    Bitcoin,
    #[serde(rename = "LTC")]
    Litecoin,
    #[serde(rename = "DOGE")]
    Dogecoin,
    #[serde(rename = "SOL")]
    Solana,
    #[serde(rename = "ARBITRUM")]
    Arbitrum,
}

impl WalletNetwork {
    pub fn label(&self) -> &'static str {
        match self {
            WalletNetwork::Bep20 => "BEP20",
            WalletNetwork::Erc20 => "ERC20",
            WalletNetwork::Trc20 => "TRC20",
            WalletNetwork::Bitcoin => "BTC",
            WalletNetwork::Litecoin => "LTC",
            WalletNetwork::Dogecoin => "DOGE",
            WalletNetwork::Solana => "SOL",
            WalletNetwork::Arbitrum => "ARBITRUM",
        }
    }

    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.trim().to_uppercase().as_str() {
            "BEP20" | "BSC" | "BNB" => Some(WalletNetwork::Bep20),
            "ERC20" | "ETH" | "ETHEREUM" => Some(WalletNetwork::Erc20),
            "TRC20" | "TRON" | "TRX" => Some(WalletNetwork::Trc20),
            "BTC" | "BITCOIN" => Some(WalletNetwork::Bitcoin),
            "LTC" | "LITECOIN" => Some(WalletNetwork::Litecoin),
            "DOGE" | "DOGECOIN" => Some(WalletNetwork::Dogecoin),
            "SOL" | "SOLANA" => Some(WalletNetwork::Solana),
            "ARBITRUM" | "ARB" => Some(WalletNetwork::Arbitrum),
            _ => None,
        }
    }
}

const HEX40: &str = r"^0x[a-fA-F0-9]{40}$";

static PATTERNS: Lazy<Vec<(WalletNetwork, Regex)>> = Lazy::new(|| {
    [
        (WalletNetwork::Bep20, HEX40),
        (WalletNetwork::Erc20, HEX40),
        (WalletNetwork::Trc20, r"^T[1-9A-HJ-NP-Za-km-z]{33}$"),
        (
            WalletNetwork::Bitcoin,
            r"^(bc1[a-z0-9]{39,59}|[13][a-km-zA-HJ-NP-Z1-9]{25,34})$",
        ),
        (
            WalletNetwork::Litecoin,
            r"^(ltc1[a-z0-9]{39,59}|[LM3][a-km-zA-HJ-NP-Z1-9]{26,33})$",
        ),
        (
            WalletNetwork::Dogecoin,
            r"^D[5-9A-HJ-NP-U][1-9A-HJ-NP-Za-km-z]{32}$",
        ),
        (WalletNetwork::Solana, r"^[1-9A-HJ-NP-Za-km-z]{32,44}$"),
        (WalletNetwork::Arbitrum, HEX40),
    ]
    .into_iter()
    .map(|(network, pattern)| (network, Regex::new(pattern).expect("Invalid wallet regex")))
    .collect()
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletValidation {
    pub is_valid: bool,
    pub matched_type: Option<WalletNetwork>,
    pub errors: Vec<String>,
}

impl WalletValidation {
    fn invalid(error: String) -> Self {
        Self {
            is_valid: false,
            matched_type: None,
            errors: vec![error],
        }
    }

    fn matched(network: WalletNetwork) -> Self {
        Self {
            is_valid: true,
            matched_type: Some(network),
            errors: Vec::new(),
        }
    }
}

pub fn validate_wallet_address(address: &str, network_hint: Option<&str>) -> WalletValidation {
    let address = address.trim();
    if address.is_empty() {
        return WalletValidation::invalid("Wallet address is required".to_string());
    }

    if let Some(hint) = network_hint.filter(|h| !h.trim().is_empty()) {
        let Some(network) = WalletNetwork::from_hint(hint) else {
            return WalletValidation::invalid(format!("Unsupported wallet network: {}", hint));
        };
        let matches = PATTERNS
            .iter()
            .any(|(candidate, regex)| *candidate == network && regex.is_match(address));
        return if matches {
            WalletValidation::matched(network)
        } else {
            WalletValidation::invalid(format!("Invalid {} address format", network.label()))
        };
    }

    PATTERNS
        .iter()
        .find(|(_, regex)| regex.is_match(address))
        .map(|(network, _)| WalletValidation::matched(*network))
        .unwrap_or_else(|| {
            WalletValidation::invalid(
                "Wallet address does not match any supported network".to_string(),
            )
        })
}
