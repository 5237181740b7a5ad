//! Market data acquisition and caching

pub mod acquire;
pub mod align;
pub mod cache;
pub mod fetcher;
pub mod provider;
pub mod series;
pub mod yahoo;

pub use acquire::{acquire, AcquireOptions, Acquisition};
pub use align::{Column, PriceTable};
pub use cache::{is_fresh, CacheStatus, PriceCache};
pub use fetcher::{Fetcher, RetryPolicy, SeriesFetcher};
pub use provider::{DataError, DataSource, FetchStrategy};
pub use series::{DailyBar, PriceSeries};
