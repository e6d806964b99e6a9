pub mod client;
pub mod variant;

pub use client::{Credentials, FetchError, MarketClient};
pub use variant::{ExchangeVariant, VariantProfile};
