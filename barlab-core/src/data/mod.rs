//! Feed sources: in-memory, CSV-backed, and synthetic.

pub mod csv_source;
pub mod feed;
pub mod synthetic;

pub use csv_source::{load_bars, write_bars, FeedError};
pub use feed::{BarFeed, FeedBuilder, FeedStatus, VecFeed};
pub use synthetic::{generate, SyntheticConfig};
