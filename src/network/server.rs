//! TCP Server
//!
//! Accepts connections and dispatches them to worker threads.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel;

use crate::config::Config;
use crate::error::{DiskwireError, Result};
use crate::storage::Store;

use super::ConnectionHandler;

/// TCP server for the diskwire daemon
pub struct Server {
    config: Config,
    listener: TcpListener,
    store: Arc<Store>,
    shutdown: Arc<AtomicBool>,
}

/// Stops a running server from another thread
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    wake_addr: SocketAddr,
}

impl ShutdownHandle {
    /// Signal the server to stop accepting and drain its workers
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
        // Unblock the accept loop; it checks the flag on every connection
        if let Err(e) = TcpStream::connect(self.wake_addr) {
            tracing::warn!(
                "Failed to wake accept loop at {}: {}; it stops on the next connection",
                self.wake_addr,
                e
            );
        }
    }
}

impl Server {
    /// Bind the listener on `config.daemon_addr`
    pub fn bind(config: Config, store: Arc<Store>) -> Result<Self> {
        if config.workers == 0 {
            return Err(DiskwireError::Config(
                "workers must be at least 1".to_string(),
            ));
        }

        let listener = TcpListener::bind(&config.daemon_addr)?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            config,
            listener,
            store,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Get a handle that can stop this server
    pub fn shutdown_handle(&self) -> Result<ShutdownHandle> {
        let mut wake_addr = self.local_addr()?;
        if wake_addr.ip().is_unspecified() {
            let loopback = match wake_addr.ip() {
                IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
            };
            wake_addr.set_ip(loopback);
        }

        Ok(ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            wake_addr,
        })
    }

    /// Start the server (blocking until shutdown)
    ///
    /// One acceptor (this thread) feeds `config.workers` workers; each worker
    /// serves one connection at a time to completion.
    pub fn run(self) -> Result<()> {
        let (sender, receiver) = channel::unbounded::<TcpStream>();

        let mut workers = Vec::with_capacity(self.config.workers);
        for id in 0..self.config.workers {
            let receiver = receiver.clone();
            let store = Arc::clone(&self.store);
            let config = self.config.clone();

            let worker = thread::Builder::new()
                .name(format!("diskwire-worker-{}", id))
                .spawn(move || {
                    for stream in receiver {
                        serve(stream, Arc::clone(&store), &config);
                    }
                })?;
            workers.push(worker);
        }
        drop(receiver);

        let mut accept_failures = 0u32;
        for stream in self.listener.incoming() {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            match stream {
                Ok(stream) => {
                    accept_failures = 0;
                    if sender.send(stream).is_err() {
                        tracing::error!("All workers exited, stopping accept loop");
                        break;
                    }
                }
                Err(e) => {
                    // Back off so a persistent error such as EMFILE does not spin
                    accept_failures = accept_failures.saturating_add(1);
                    let delay = accept_backoff(accept_failures);
                    tracing::warn!("Accept failed: {}, retrying in {:?}", e, delay);
                    thread::sleep(delay);
                }
            }
        }

        tracing::info!("Shutting down, waiting for in-flight connections");
        drop(sender);
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }

        Ok(())
    }
}

/// Delay before retrying after `failures` consecutive accept errors
///
/// Doubles from 10ms and caps at 1s.
fn accept_backoff(failures: u32) -> Duration {
    const BASE_MS: u64 = 10;
    const MAX_MS: u64 = 1000;

    let shift = failures.saturating_sub(1).min(16);
    Duration::from_millis((BASE_MS << shift).min(MAX_MS))
}

/// Serve one connection, logging (not propagating) its failure
fn serve(stream: TcpStream, store: Arc<Store>, config: &Config) {
    let mut handler = match ConnectionHandler::new(stream, store, config) {
        Ok(handler) => handler,
        Err(e) => {
            tracing::warn!("Failed to set up connection: {}", e);
            return;
        }
    };

    if let Err(e) = handler.handle() {
        tracing::warn!("Connection from {} aborted: {}", handler.peer_addr(), e);
    }
}
