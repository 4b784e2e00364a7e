//! KuCoin Candle Types
//!
//! Response structure of `GET /api/v1/market/candles`.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::CandleRow;

/// Candles response. KuCoin answers unknown pairs with HTTP 200 and an error
/// `code`/`msg` but no `data`, so `data` is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct CandlesResponse {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Vec<Vec<Value>>,
}

impl CandlesResponse {
    /// Convert raw cell arrays into rows, skipping malformed ones
    pub fn into_rows(self) -> Vec<CandleRow> {
        self.data
            .iter()
            .filter_map(|cells| {
                let cells: Vec<String> = cells.iter().map(cell_to_string).collect();
                CandleRow::from_cells(&cells)
            })
            .collect()
    }
}

fn cell_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_candles() {
        let body = r#"{
            "code": "200000",
            "data": [
                ["1700000060", "0.0801", "0.0805", "0.0800", "0.0806", "120345.1", "9650.2"],
                ["1700000000", "0.0799", "0.0801", "0.0798", "0.0802", "99012.7", "7912.0"]
            ]
        }"#;
        let response: CandlesResponse = serde_json::from_str(body).unwrap();
        let rows = response.into_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].time, "1700000060");
        assert_eq!(rows[0].close, "0.0805");
        assert_eq!(rows[1].volume, "99012.7");
    }

    #[test]
    fn test_unsupported_pair_has_no_data() {
        let body = r#"{"code":"400100","msg":"This pair is not provided at present"}"#;
        let response: CandlesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.code.as_deref(), Some("400100"));
        assert!(response.into_rows().is_empty());
    }

    #[test]
    fn test_numeric_cells_and_short_rows() {
        let body = r#"{"data": [[1700000000, 1.5, 2, 1, 2.5, 10], ["1", "2"]]}"#;
        let response: CandlesResponse = serde_json::from_str(body).unwrap();
        let rows = response.into_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].to_string(), "1700000000,1.5,2,1,2.5,10");
    }
}
