/// Market quote cache: refresh orchestration plus the derived search view.
pub mod filter;
pub mod service;

pub use filter::SearchFilter;
pub use service::{MarketService, MarketView};
