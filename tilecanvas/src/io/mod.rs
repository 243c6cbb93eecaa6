mod fetch;
pub mod http;
pub mod runtime;

pub use fetch::{Fetch, FetchError, HttpFetch, Stats};
pub(crate) use fetch::fetch_continuously;
pub use http::{HttpOptions, MaxParallelDownloads};
