//! Canonical symbol <-> provider ticker mapping

use std::collections::HashMap;

/// Maps canonical symbols ("GBPUSD") to provider tickers ("GBPUSD=X")
#[derive(Debug, Clone, Default)]
pub struct SymbolMap {
    tickers: HashMap<String, String>,
    reverse: HashMap<String, String>,
}

impl SymbolMap {
    /// Create a map from canonical -> ticker pairs
    pub fn new(tickers: &HashMap<String, String>) -> Self {
        let tickers: HashMap<String, String> = tickers
            .iter()
            .map(|(s, t)| (s.trim().to_uppercase(), t.trim().to_string()))
            .collect();
        let reverse = tickers
            .iter()
            .map(|(s, t)| (t.to_uppercase(), s.clone()))
            .collect();
        Self { tickers, reverse }
    }

    /// Provider ticker for a canonical symbol; unmapped symbols pass through
    pub fn ticker_for(&self, symbol: &str) -> String {
        let key = symbol.trim().to_uppercase();
        self.tickers.get(&key).cloned().unwrap_or(key)
    }

    /// Normalize user input to a canonical symbol
    ///
    /// Trims and uppercases; a known provider ticker maps back to its symbol.
    pub fn canonical(&self, input: &str) -> String {
        let key = input.trim().to_uppercase();
        if self.tickers.contains_key(&key) {
            return key;
        }
        self.reverse.get(&key).cloned().unwrap_or(key)
    }
}
