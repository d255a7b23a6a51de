use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use valuation_core::clean_ticker;

/// Repository for the user's saved tickers. Always injected into callers;
/// never a module-level singleton.
pub trait WatchlistStore: Send + Sync {
    fn load(&self) -> Result<Vec<String>>;
    fn add(&self, ticker: &str) -> Result<()>;
    fn remove(&self, ticker: &str) -> Result<()>;
}

/// JSON file store. Tickers are kept uppercase, deduplicated and sorted.
pub struct JsonFileWatchlist {
    path: PathBuf,
}

impl JsonFileWatchlist {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Conventional per-user location, e.g. `~/.local/share/b3-screener/watchlist.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("b3-screener").join("watchlist.json"))
    }

    fn save(&self, tickers: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(tickers)?;
        fs::write(&self.path, json)
            .with_context(|| format!("writing {}", self.path.display()))
    }
}

impl WatchlistStore for JsonFileWatchlist {
    fn load(&self) -> Result<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", self.path.display()))
    }

    fn add(&self, ticker: &str) -> Result<()> {
        let ticker = clean_ticker(ticker);
        let mut tickers = self.load()?;
        if !tickers.contains(&ticker) {
            tickers.push(ticker);
            tickers.sort();
            self.save(&tickers)?;
        }
        Ok(())
    }

    fn remove(&self, ticker: &str) -> Result<()> {
        let ticker = clean_ticker(ticker);
        let mut tickers = self.load()?;
        let before = tickers.len();
        tickers.retain(|t| t != &ticker);
        if tickers.len() != before {
            self.save(&tickers)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> JsonFileWatchlist {
        let path = std::env::temp_dir().join(format!(
            "b3-screener-test-{}-{}.json",
            name,
            std::process::id()
        ));
        let _ = fs::remove_file(&path);
        JsonFileWatchlist::new(path)
    }

    #[test]
    fn test_load_without_file_is_empty() {
        let store = temp_store("empty");
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_add_normalizes_and_is_idempotent() {
        let store = temp_store("add");

        store.add("petr4.sa").unwrap();
        store.add("PETR4").unwrap();
        store.add("vale3").unwrap();

        assert_eq!(store.load().unwrap(), vec!["PETR4", "VALE3"]);

        let _ = fs::remove_file(&store.path);
    }

    #[test]
    fn test_remove_absent_ticker_is_noop() {
        let store = temp_store("remove");

        store.add("ITSA4").unwrap();
        store.remove("BBAS3").unwrap();
        store.remove("itsa4").unwrap();

        assert!(store.load().unwrap().is_empty());

        let _ = fs::remove_file(&store.path);
    }

    #[test]
    fn test_round_trips_through_json() {
        let store = temp_store("roundtrip");

        store.add("TAEE11").unwrap();
        store.add("BBSE3").unwrap();

        let text = fs::read_to_string(&store.path).unwrap();
        let parsed: Vec<String> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, vec!["BBSE3", "TAEE11"]);

        let _ = fs::remove_file(&store.path);
    }
}
