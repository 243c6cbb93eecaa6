use std::num::NonZeroUsize;
use std::time::Duration;

/// Controls how [`crate::HttpTiles`] use the HTTP protocol.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// User agent to be sent to the tile servers.
    pub user_agent: String,

    /// Identity of the person or application operating the client, such as an e-mail address.
    /// Some providers (such as OpenStreetMap) require it to be reachable from the user agent.
    /// <https://operations.osmfoundation.org/policies/tiles/>
    pub contact: Option<String>,

    /// Limit of the whole request, including reading the body.
    pub timeout: Duration,

    pub connect_timeout: Duration,

    /// How many times a tile is requested before giving up and showing a placeholder.
    pub attempts: usize,

    /// Maximum number of parallel downloads.
    ///
    /// Many services have rate limits, and exceeding them may result in throttling, bans, or
    /// degraded service. Use the default value when in doubt.
    pub max_parallel_downloads: MaxParallelDownloads,

    /// Number of tiles kept in memory.
    pub cache_capacity: NonZeroUsize,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_owned(),
            contact: None,
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            attempts: 2,
            max_parallel_downloads: MaxParallelDownloads::default(),
            // Just arbitrary value which seemed right.
            cache_capacity: NonZeroUsize::new(256).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl HttpOptions {
    /// Complete `User-Agent` header value.
    pub fn user_agent_header(&self) -> String {
        match &self.contact {
            Some(contact) => format!("{} ({contact})", self.user_agent),
            None => self.user_agent.clone(),
        }
    }
}

/// Maximum number of parallel downloads.
#[derive(Debug, Clone, Copy)]
pub struct MaxParallelDownloads(pub usize);

impl Default for MaxParallelDownloads {
    /// Default number of parallel downloads. Following modern browsers' behavior.
    /// <https://stackoverflow.com/questions/985431/max-parallel-http-connections-in-a-browser>
    fn default() -> Self {
        Self(6)
    }
}

impl MaxParallelDownloads {
    /// Use custom value.
    ///
    /// Many services have rate limits, and exceeding them may result in throttling, bans, or
    /// degraded service. You are **strongly encouraged** to check the Terms of Use of the
    /// particular provider you are using.
    pub fn value_manually_confirmed_with_provider_limits(value: usize) -> Self {
        Self(value)
    }
}
