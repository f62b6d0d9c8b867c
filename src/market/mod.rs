pub mod feed;
pub mod mock;

pub use feed::{FeedError, MarketDataFeed, Ticker};
pub use mock::MockMarketDataFeed;
