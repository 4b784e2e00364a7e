//! Token tallies
//!
//! Per-run count of how often each token symbol appears in the filtered
//! whale-transaction view.

use std::collections::HashMap;

/// Minimum mentions for a token to be analyzed and reported
pub const DEFAULT_MATERIALITY_THRESHOLD: u32 = 5;

/// Normalize a rendered symbol: trimmed and uppercased. Empty after trimming
/// means the element carried no symbol.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}

/// Occurrence count per normalized symbol
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenTally {
    counts: HashMap<String, u32>,
}

impl TokenTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tally every non-empty symbol in `texts`
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tally = Self::new();
        for text in texts {
            tally.record(text.as_ref());
        }
        tally
    }

    /// Count one mention. Blank text is ignored.
    pub fn record(&mut self, raw: &str) {
        if let Some(symbol) = normalize_symbol(raw) {
            *self.counts.entry(symbol).or_insert(0) += 1;
        }
    }

    pub fn count(&self, symbol: &str) -> u32 {
        normalize_symbol(symbol)
            .and_then(|s| self.counts.get(&s).copied())
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Total mentions across all symbols
    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    /// Tokens with `count >= threshold`, most mentioned first, ties by symbol
    pub fn qualifying(&self, threshold: u32) -> Vec<(String, u32)> {
        let mut selected: Vec<(String, u32)> = self
            .counts
            .iter()
            .filter(|(_, &count)| count >= threshold)
            .map(|(symbol, &count)| (symbol.clone(), count))
            .collect();
        selected.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        selected
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(s, &c)| (s.as_str(), c))
    }
}

impl FromIterator<(String, u32)> for TokenTally {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        let mut tally = Self::new();
        for (raw, count) in iter {
            if let Some(symbol) = normalize_symbol(&raw) {
                *tally.counts.entry(symbol).or_insert(0) += count;
            }
        }
        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundary() {
        let tally: TokenTally = [("FOUR".to_string(), 4), ("FIVE".to_string(), 5)]
            .into_iter()
            .collect();
        let selected = tally.qualifying(DEFAULT_MATERIALITY_THRESHOLD);
        assert_eq!(selected, vec![("FIVE".to_string(), 5)]);
    }

    #[test]
    fn test_only_doge_qualifies() {
        let tally: TokenTally = [("DOGE".to_string(), 7), ("SHIB".to_string(), 3)]
            .into_iter()
            .collect();
        let selected: Vec<String> = tally.qualifying(5).into_iter().map(|(s, _)| s).collect();
        assert_eq!(selected, vec!["DOGE"]);
    }

    #[test]
    fn test_from_texts_trims_and_uppercases() {
        let tally = TokenTally::from_texts([" eth", "ETH ", "Eth", "  ", "", "usdt"]);
        assert_eq!(tally.count("ETH"), 3);
        assert_eq!(tally.count("usdt"), 1);
        assert_eq!(tally.len(), 2);
        assert_eq!(tally.total(), 4);
    }

    #[test]
    fn test_empty_tally() {
        let tally = TokenTally::from_texts(Vec::<String>::new());
        assert!(tally.is_empty());
        assert!(tally.qualifying(1).is_empty());
    }

    #[test]
    fn test_qualifying_order() {
        let tally: TokenTally = [
            ("BBB".to_string(), 6),
            ("AAA".to_string(), 6),
            ("CCC".to_string(), 9),
        ]
        .into_iter()
        .collect();
        let order: Vec<String> = tally.qualifying(5).into_iter().map(|(s, _)| s).collect();
        assert_eq!(order, vec!["CCC", "AAA", "BBB"]);
    }
}
