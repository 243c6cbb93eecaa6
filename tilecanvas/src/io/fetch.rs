//! Asynchronous fetching loop.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use egui::Context;
use futures::{
    SinkExt, StreamExt,
    channel::mpsc::{Receiver, Sender},
    future::{Either, select, select_all},
};
use reqwest::StatusCode;

use crate::io::HttpOptions;
use crate::sources::TileSource;
use crate::tiles::{Tile, TileId};

/// Statistics of the downloads.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    /// Number of tiles which are currently being downloaded.
    pub in_progress: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("server responded with {0}")]
    Status(StatusCode),

    #[error("response body is not a recognized image")]
    NotAnImage,

    #[error("giving up on '{url}' after {attempts} attempt(s), last error: {last}")]
    Exhausted {
        url: String,
        attempts: usize,
        last: String,
    },
}

/// Something able to deliver raw tile bytes.
pub trait Fetch {
    type Error: std::error::Error + Sync + Send;

    fn fetch(&self, tile_id: TileId) -> impl Future<Output = Result<Bytes, Self::Error>> + Send;

    fn max_concurrency(&self) -> usize;
}

/// Fetches tiles of a [`TileSource`] over HTTP, retrying failed attempts.
pub struct HttpFetch<S> {
    source: S,
    client: reqwest::Client,
    attempts: usize,
    max_concurrency: usize,
}

impl<S: TileSource> HttpFetch<S> {
    pub fn new(source: S, options: &HttpOptions) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(options.user_agent_header())
            .timeout(options.timeout)
            .connect_timeout(options.connect_timeout)
            .build()?;

        Ok(Self {
            source,
            client,
            attempts: options.attempts.max(1),
            max_concurrency: options.max_parallel_downloads.0.max(1),
        })
    }

    async fn attempt(&self, url: &str) -> Result<Bytes, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let bytes = response.bytes().await?;
        image::guess_format(&bytes).map_err(|_| FetchError::NotAnImage)?;
        Ok(bytes)
    }
}

impl<S> Fetch for HttpFetch<S>
where
    S: TileSource + Send + Sync,
{
    type Error = FetchError;

    fn fetch(&self, tile_id: TileId) -> impl Future<Output = Result<Bytes, FetchError>> + Send {
        async move {
            let url = self.source.tile_url(tile_id);
            let mut last = String::new();

            for attempt in 1..=self.attempts {
                match self.attempt(&url).await {
                    Ok(bytes) => return Ok(bytes),
                    Err(err) => {
                        log::warn!(
                            "Attempt {attempt}/{} to fetch '{url}' failed: {err}",
                            self.attempts
                        );
                        last = err.to_string();
                    }
                }
            }

            Err(FetchError::Exhausted {
                url,
                attempts: self.attempts,
                last,
            })
        }
    }

    fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("Tile request channel from the main thread was broken.")]
    RequestChannelBroken,

    #[error("Tile channel to the main thread was closed.")]
    TileChannelClosed,

    #[error("Tile channel to the main thread was full.")]
    TileChannelFull,

    #[error("Poison error.")]
    Poisoned,
}

impl From<futures::channel::mpsc::SendError> for Error {
    fn from(error: futures::channel::mpsc::SendError) -> Self {
        if error.is_disconnected() {
            Error::TileChannelClosed
        } else {
            Error::TileChannelFull
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Error::Poisoned
    }
}

/// Fetch the tile, falling back to the "missing" placeholder. Never fails, so that the tile is
/// not requested again.
async fn fetch_or_placeholder(fetch: &impl Fetch, tile_id: TileId) -> (TileId, Tile) {
    let tile = match fetch.fetch(tile_id).await {
        Ok(bytes) => Tile::raster(bytes).unwrap_or_else(|err| {
            log::warn!("Tile {tile_id:?} is unusable: {err}");
            Tile::missing()
        }),
        Err(err) => {
            log::warn!("{err}");
            Tile::missing()
        }
    };
    (tile_id, tile)
}

async fn fetch_complete(
    mut tile_tx: Sender<(TileId, Tile)>,
    egui_ctx: Context,
    fetched: (TileId, Tile),
) -> Result<(), Error> {
    tile_tx.send(fetched).await?;
    egui_ctx.request_repaint();
    Ok(())
}

async fn fetch_continuously_impl(
    fetch: impl Fetch,
    stats: Arc<Mutex<Stats>>,
    mut request_rx: Receiver<TileId>,
    tile_tx: Sender<(TileId, Tile)>,
    egui_ctx: Context,
) -> Result<(), Error> {
    let mut outstanding = Vec::new();

    loop {
        if outstanding.is_empty() {
            // Only new downloads might be requested.
            let tile_id = request_rx.next().await.ok_or(Error::RequestChannelBroken)?;
            outstanding.push(Box::pin(fetch_or_placeholder(&fetch, tile_id)));
        } else if outstanding.len() < fetch.max_concurrency() {
            // New downloads might be requested or ongoing downloads might be completed.
            match select(request_rx.next(), select_all(outstanding.drain(..))).await {
                Either::Left((request, remaining)) => {
                    let tile_id = request.ok_or(Error::RequestChannelBroken)?;
                    outstanding = remaining.into_inner();
                    outstanding.push(Box::pin(fetch_or_placeholder(&fetch, tile_id)));
                }
                Either::Right(((fetched, _, remaining), _)) => {
                    fetch_complete(tile_tx.to_owned(), egui_ctx.to_owned(), fetched).await?;
                    outstanding = remaining;
                }
            }
        } else {
            // Only ongoing downloads might be completed.
            let (fetched, _, remaining) = select_all(outstanding.drain(..)).await;
            fetch_complete(tile_tx.to_owned(), egui_ctx.to_owned(), fetched).await?;
            outstanding = remaining;
        }

        let mut stats = stats.lock()?;
        stats.in_progress = outstanding.len();
    }
}

/// Continuously fetch tiles requested via request channel.
pub(crate) async fn fetch_continuously(
    fetch: impl Fetch,
    stats: Arc<Mutex<Stats>>,
    request_rx: Receiver<TileId>,
    tile_tx: Sender<(TileId, Tile)>,
    egui_ctx: Context,
) {
    match fetch_continuously_impl(fetch, stats, request_rx, tile_tx, egui_ctx).await {
        Ok(()) | Err(Error::TileChannelClosed) | Err(Error::RequestChannelBroken) => {
            log::debug!("Tile fetch loop finished.");
        }
        Err(error) => {
            log::error!("Tile fetch loop failed: {error}.");
        }
    }
}
