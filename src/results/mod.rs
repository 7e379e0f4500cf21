pub mod aggregator;
pub mod poller;

pub use aggregator::{fetch_results, ResultsState, ComparisonCard};
pub use poller::ResultsPoller;
