//! Rendered page cache.
//!
//! Holds the rendered bytes of the home feed for a short time-to-live so that
//! bursts of anonymous traffic do not hit the database. Entries expire on
//! their own or are dropped through the administrative invalidation routes;
//! writes to posts never invalidate them.
//!
//! ```toml
//! [cache]
//! enabled = true
//! home_ttl_seconds = 20
//! key_prefix = "index_page"
//! max_entries = 256
//! ```

mod clock;
mod config;
mod keys;
mod lock;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::PageCacheConfig;
pub use keys::home_page_key;
pub use store::{METRIC_EXPIRED, METRIC_HIT, METRIC_INVALIDATED, METRIC_MISS, PageCache};
