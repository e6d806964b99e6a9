// =============================================================================
// Central Application State — CoinPulse screener
// =============================================================================
//
// Thread safety:
//   - parking_lot::RwLock for the mutable config.
//   - The client and cache manage their own interior state and are shared
//     through the surrounding Arc.
// =============================================================================

use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::cache::ResultCache;
use crate::config::ScreenerConfig;
use crate::exchange::client::MarketClient;

/// Shared state for all API handlers, wrapped in `Arc` at startup.
pub struct AppState {
    pub config: RwLock<ScreenerConfig>,
    pub client: MarketClient,
    pub cache: ResultCache,
    /// Instant when the process started. Used for uptime reporting.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: ScreenerConfig, client: MarketClient) -> Self {
        let cache = ResultCache::new(Duration::from_secs(config.cache_ttl_secs));
        Self {
            config: RwLock::new(config),
            client,
            cache,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
