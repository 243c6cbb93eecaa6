//! Tiny HTTP server for tests, answering only the requests it was told to anticipate.

use http_body_util::Full;
use hyper::{Request, Response, server::conn::http1, service::Service};
use hyper_util::rt::TokioIo;
use std::{
    collections::{HashMap, VecDeque},
    future::Future,
    net::SocketAddr,
    pin::Pin,
    sync::{Arc, Mutex},
};
use tokio::{net::TcpListener, sync::oneshot};

pub use hyper::{self, HeaderMap, StatusCode, body::Bytes};

/// Request which reached the server, waiting for the test to respond.
struct Arrival {
    headers: HeaderMap,
    respond: oneshot::Sender<Response<Full<Bytes>>>,
}

#[derive(Default)]
struct State {
    /// Requests announced by [`Server::anticipate`], in order, per path.
    anticipated: HashMap<String, VecDeque<oneshot::Sender<Arrival>>>,

    unexpected: Vec<String>,
}

pub struct Server {
    port: u16,
    state: Arc<Mutex<State>>,
}

impl Server {
    /// Create new [`Server`], and bind it to a random port.
    pub async fn bind() -> Server {
        let state = Arc::new(Mutex::new(State::default()));

        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = TcpListener::bind(addr).await.expect("binding mock server");
        let port = listener.local_addr().expect("mock server address").port();

        let state_clone = Arc::clone(&state);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    log::warn!("Mock server stopped accepting connections.");
                    break;
                };
                let io = TokioIo::new(stream);

                let state = Arc::clone(&state_clone);
                tokio::task::spawn(async move {
                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, Connection { state })
                        .await
                    {
                        log::debug!("Connection ended with: {err}");
                    }
                });
            }
        });

        Server { port, state }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Announce that a request for `path` is going to come. Anticipating the same path several
    /// times matches subsequent requests in order.
    pub async fn anticipate(&self, path: impl Into<String>) -> AnticipatedRequest {
        let path = path.into();
        log::info!("Anticipating '{path}'.");

        let (tx, rx) = oneshot::channel();
        self.state
            .lock()
            .expect("mock state")
            .anticipated
            .entry(path.clone())
            .or_default()
            .push_back(tx);

        AnticipatedRequest {
            path,
            arrival_rx: Some(rx),
            arrival: None,
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }

        let state = self.state.lock().expect("mock state");
        if !state.unexpected.is_empty() {
            panic!("there are unexpected requests: {:?}", state.unexpected);
        }
    }
}

pub struct AnticipatedRequest {
    path: String,
    arrival_rx: Option<oneshot::Receiver<Arrival>>,
    arrival: Option<Arrival>,
}

impl AnticipatedRequest {
    /// Wait until the request actually comes and return its headers.
    pub async fn expect(&mut self) -> HeaderMap {
        if let Some(rx) = self.arrival_rx.take() {
            log::info!("Waiting for '{}'.", self.path);
            self.arrival = Some(rx.await.expect("mock server is gone"));
        }

        self.arrival
            .as_ref()
            .map(|arrival| arrival.headers.clone())
            .unwrap_or_default()
    }

    /// Respond with `200 OK` and given body, waiting for the request first if needed.
    pub async fn respond(self, body: impl Into<Bytes>) {
        self.send(Response::new(Full::new(body.into()))).await;
    }

    pub async fn respond_with_status(self, status: StatusCode) {
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = status;
        self.send(response).await;
    }

    async fn send(mut self, response: Response<Full<Bytes>>) {
        self.expect().await;
        log::info!("Responding to '{}' with {}.", self.path, response.status());

        if let Some(arrival) = self.arrival.take() {
            // Client might have given up already.
            let _ = arrival.respond.send(response);
        }
    }
}

struct Connection {
    state: Arc<Mutex<State>>,
}

impl Service<Request<hyper::body::Incoming>> for Connection {
    type Response = Response<Full<Bytes>>;
    type Error = hyper::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, request: Request<hyper::body::Incoming>) -> Self::Future {
        log::info!("Incoming request '{}'.", request.uri());
        let state = Arc::clone(&self.state);

        Box::pin(async move {
            let path = request.uri().path().to_owned();
            let anticipated = state
                .lock()
                .expect("mock state")
                .anticipated
                .get_mut(&path)
                .and_then(VecDeque::pop_front);

            let (respond, response_rx) = oneshot::channel();
            let arrival = Arrival {
                headers: request.headers().clone(),
                respond,
            };

            match anticipated.map(|tx| tx.send(arrival)) {
                Some(Ok(())) => Ok(response_rx.await.unwrap_or_else(|_| {
                    let mut response = Response::new(Full::new(Bytes::from_static(b"dropped")));
                    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                    response
                })),
                _ => {
                    log::warn!("Unexpected '{path}'.");
                    state.lock().expect("mock state").unexpected.push(path);

                    let mut response = Response::new(Full::new(Bytes::from_static(b"unexpected")));
                    *response.status_mut() = StatusCode::IM_A_TEAPOT;
                    Ok(response)
                }
            }
        })
    }
}
