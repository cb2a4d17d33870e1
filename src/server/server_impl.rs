//! The server: bind, accept, dispatch to workers, shut down cleanly.

use crate::{errors::ErrorKind, limits::ServerConfig};
use crossbeam::queue::SegQueue;
use std::{
    future::Future,
    io,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpSocket, TcpStream},
    sync::watch,
    task::JoinHandle,
    time::{sleep, timeout},
};
use tracing::debug;

/// How long [`Server::close`] waits for in-flight connections before
/// aborting their workers.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

/// How long an idle worker sleeps between queue polls.
const WORKER_POLL_INTERVAL: Duration = Duration::from_micros(50);

/// A handler for one accepted socket.
///
/// Two shapes share this trait: raw socket handlers (tests, the redirect
/// handler) and the composed HTTP handler from
/// [`WebFramework::make_primary_http_handler`](crate::WebFramework::make_primary_http_handler).
/// The stream parameter is generic so handlers run against in-memory
/// streams in tests exactly as they run against sockets in production.
pub trait SocketHandler: Send + Sync + 'static {
    fn handle<S>(
        &self,
        stream: S,
        remote_requester: String,
    ) -> impl Future<Output = Result<(), ErrorKind>> + Send
    where
        S: AsyncRead + AsyncWrite + Unpin + Send;
}

/// A running server.
///
/// Binds on construction via [`Server::builder`], accepts until
/// [`Server::close`] is called.  Accepted sockets go onto a shared queue
/// that a fixed pool of worker tasks drains; each worker runs the injected
/// [`SocketHandler`] and releases the socket on every exit path.
///
/// # Examples
///
/// ```no_run
/// use minum::{Response, Server, ServerConfig, Verb, WebFramework};
///
/// #[tokio::main]
/// async fn main() {
///     let mut wf = WebFramework::new(ServerConfig::default());
///     wf.register_path(Verb::Get, "hello", |_| Response::html_ok("Hello World!"));
///
///     let server = Server::builder()
///         .handler(wf.make_primary_http_handler())
///         .start()
///         .await
///         .unwrap();
///
///     println!("listening on {}:{}", server.host(), server.port());
///     server.close().await;
/// }
/// ```
pub struct Server {
    host: IpAddr,
    port: u16,
    shutdown: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
    worker_tasks: Vec<JoinHandle<()>>,
}

type TcpQueue = Arc<SegQueue<(TcpStream, SocketAddr)>>;

impl Server {
    /// Creates a builder for configuring the server instance.
    pub fn builder<H: SocketHandler>() -> ServerBuilder<H> {
        ServerBuilder {
            config: None,
            handler: None,
        }
    }

    /// The address the server bound to.
    pub fn host(&self) -> IpAddr {
        self.host
    }

    /// The port the server bound to.  Useful with an ephemeral port of `0`.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Stops accepting, lets in-flight connections drain briefly, and
    /// releases the port.
    ///
    /// Workers still busy after the grace window are aborted, which closes
    /// their sockets; the listener itself is gone as soon as the accept
    /// task ends, so the port can be rebound immediately.
    pub async fn close(self) {
        let _ = self.shutdown.send(true);
        let _ = self.accept_task.await;

        for mut worker in self.worker_tasks {
            if timeout(SHUTDOWN_GRACE, &mut worker).await.is_err() {
                worker.abort();
            }
        }
    }

    fn spawn_worker<H: SocketHandler>(
        queue: &TcpQueue,
        handler: &Arc<H>,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let queue = queue.clone();
        let handler = handler.clone();

        tokio::spawn(async move {
            loop {
                let Some((stream, addr)) = queue.pop() else {
                    if *shutdown.borrow() {
                        return;
                    }
                    sleep(WORKER_POLL_INTERVAL).await;
                    continue;
                };

                if let Err(err) = handler.handle(stream, addr.to_string()).await {
                    debug!(remote = %addr, error = %err, "connection ended with failure");
                }
            }
        })
    }
}

/// Builder for configuring and starting a [`Server`].
pub struct ServerBuilder<H: SocketHandler> {
    config: Option<ServerConfig>,
    handler: Option<H>,
}

impl<H: SocketHandler> ServerBuilder<H> {
    /// Sets the server configuration.  Defaults to [`ServerConfig::default`].
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the socket handler every accepted connection runs.
    ///
    /// **This is a required component.**
    pub fn handler(mut self, handler: H) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Binds the listener, spawns the worker pool and the accept loop.
    ///
    /// The listener is bound with the reuse-address option so a port can be
    /// rebound right after [`Server::close`], without waiting out the
    /// operating system's linger.
    ///
    /// # Panics
    ///
    /// Panics when no handler was set.
    pub async fn start(self) -> io::Result<Server> {
        let config = self.config.unwrap_or_default();
        let handler = Arc::new(
            self.handler
                .expect("The `handler` method must be called to start"),
        );

        let socket = TcpSocket::new_v4()?;
        socket.set_reuseaddr(true)?;
        socket.bind(SocketAddr::from(([127, 0, 0, 1], config.nonssl_server_port)))?;
        let listener = socket.listen(1024)?;
        let local_addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let queue: TcpQueue = Arc::new(SegQueue::new());

        let worker_tasks = (0..config.worker_count.max(1))
            .map(|_| Server::spawn_worker(&queue, &handler, shutdown_rx.clone()))
            .collect();

        let accept_queue = queue.clone();
        let mut accept_shutdown = shutdown_rx;
        let accept_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    _ = accept_shutdown.changed() => return,
                    accepted = listener.accept() => match accepted {
                        Ok(pair) => accept_queue.push(pair),
                        Err(err) => {
                            debug!(error = %err, "accept failed");
                        }
                    },
                }
            }
        });

        debug!(host = %local_addr.ip(), port = local_addr.port(), "server started");

        Ok(Server {
            host: local_addr.ip(),
            port: local_addr.port(),
            shutdown: shutdown_tx,
            accept_task,
            worker_tasks,
        })
    }
}
