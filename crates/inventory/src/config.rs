//! Inventory configuration, read from the process environment.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Environment variable overriding the low-stock threshold.
pub const LOW_STOCK_THRESHOLD_VAR: &str = "PHARMACY_LOW_STOCK_THRESHOLD";

/// Environment variable overriding the currency symbol used for display.
pub const CURRENCY_SYMBOL_VAR: &str = "PHARMACY_CURRENCY_SYMBOL";

pub const DEFAULT_LOW_STOCK_THRESHOLD: u64 = 20;
pub const DEFAULT_CURRENCY_SYMBOL: &str = "GH₵";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Records with `in_stock` strictly below this are low stock.
    pub low_stock_threshold: u64,
    pub currency_symbol: String,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_string(),
        }
    }
}

impl InventoryConfig {
    /// Build from `PHARMACY_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (environment, test map, ...).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(LOW_STOCK_THRESHOLD_VAR) {
            match raw.trim().parse::<u64>() {
                Ok(threshold) => config.low_stock_threshold = threshold,
                Err(e) => tracing::warn!(
                    var = LOW_STOCK_THRESHOLD_VAR,
                    value = %raw,
                    error = %e,
                    "invalid low-stock threshold; using default {}",
                    DEFAULT_LOW_STOCK_THRESHOLD
                ),
            }
        }

        if let Some(raw) = lookup(CURRENCY_SYMBOL_VAR) {
            let symbol = raw.trim();
            if symbol.is_empty() {
                tracing::warn!(
                    var = CURRENCY_SYMBOL_VAR,
                    "empty currency symbol; using default {}",
                    DEFAULT_CURRENCY_SYMBOL
                );
            } else {
                config.currency_symbol = symbol.to_string();
            }
        }

        config
    }

    /// Render an amount as the dashboard shows money: symbol + two decimals.
    pub fn format_amount(&self, amount: Decimal) -> String {
        let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(2);
        format!("{}{}", self.currency_symbol, rounded)
    }
}
