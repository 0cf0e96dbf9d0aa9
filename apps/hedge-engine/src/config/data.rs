//! Input and output locations.

use serde::{Deserialize, Serialize};

/// Data configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Market CSV with `date,close,vix` columns.
    #[serde(default = "default_market_csv")]
    pub market_csv: String,
    /// Optional option quote CSV; without it every premium is parametric.
    #[serde(default)]
    pub quotes_csv: Option<String>,
    /// Directory for valuation series and summaries.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            market_csv: default_market_csv(),
            quotes_csv: None,
            output_dir: default_output_dir(),
        }
    }
}

fn default_market_csv() -> String {
    "data/market.csv".to_string()
}

fn default_output_dir() -> String {
    "output".to_string()
}
