pub mod error;
pub mod extract;
pub mod navigator;
pub mod normalize;
pub(crate) mod rate_limit;
pub mod types;

pub use error::ScraperError;
pub use extract::Extractor;
pub use navigator::autoscroll::{autoscroll, AutoscrollOutcome, AutoscrollPolicy, Scrollable};
#[cfg(feature = "browser")]
pub use navigator::browser::{BrowserSession, BrowserSessionFactory};
pub use navigator::http::{HttpSession, HttpSessionConfig, HttpSessionFactory};
pub use navigator::settle::{wait_for_network_idle, NetworkActivity, SettlePolicy};
pub use navigator::{fetch_records, PageSession, SessionFactory};
pub use normalize::{normalize, parse_price, Rejection};
pub use types::{PageFetch, PageFetchResult, PageStatus, RawRecord};
