use crate::ids::StockId;

/// A tradeable instrument. Created once by the catalog; never deleted by
/// the core (SPEC_FULL.md §3).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Stock {
    pub id: StockId,
    pub symbol: String,
    pub company_name: String,
}

impl Stock {
    /// `true` iff `symbol` is 1-10 uppercase alphanumerics plus `.`/`-`.
    pub fn is_valid_symbol(symbol: &str) -> bool {
        let len = symbol.len();
        (1..=10).contains(&len)
            && symbol
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '.' || c == '-')
    }
}
