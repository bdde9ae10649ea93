use std::cell::RefCell;
use std::collections::HashSet;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;

use bytes::BytesMut;
use log::warn;
use snafu::{prelude::*, ResultExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Notify};
use tokio::task::{self, JoinHandle};
use tracing::{debug, error, info, instrument};

use crate::cmd::Registry;
use crate::config::Config;
use crate::connection::{Connection, ConnectionId};
use crate::player::Player;
use crate::service::Service;
use crate::shutdown::{Shutdown, Trigger};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to listen on {}: {}", addr, source))]
    BindError { addr: SocketAddr, source: io::Error },
    #[snafu(display("failed for io error {}", source))]
    IoError { source: io::Error },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// never borrowed across an `.await`
struct Shared {
    player: Rc<dyn Player>,
    password: Option<String>,
    commands: Rc<Registry>,
    // poked by player callbacks of whichever service is alive
    wake: Rc<Notify>,
    // exists iff `connections` is not empty
    service: Option<Service>,
    connections: HashSet<ConnectionId>,
    next_id: u64,
}

impl Shared {
    fn open_connection(&mut self) -> Connection {
        let id = ConnectionId(self.next_id);
        self.next_id += 1;

        let service = self.service.get_or_insert_with(|| {
            Service::new(
                Rc::clone(&self.player),
                self.password.clone(),
                Rc::clone(&self.wake),
            )
        });

        self.connections.insert(id);
        Connection::new(id, Rc::clone(&self.commands), service)
    }

    fn close_connection(&mut self, connection: &mut Connection) {
        if let Some(service) = self.service.as_mut() {
            connection.close(service);
        }

        if self.connections.remove(&connection.id()) && self.connections.is_empty() {
            if let Some(service) = self.service.take() {
                service.destroy();
            }
        }
    }
}

/// The MPD server. Must be started from within a `tokio::task::LocalSet`:
/// every task it spawns runs on the current thread.
pub struct Server {
    local_addr: SocketAddr,
    shared: Rc<RefCell<Shared>>,
    trigger: Option<Trigger>,
    shutdown_complete_rx: mpsc::Receiver<()>,
    acceptor: Option<JoinHandle<()>>,
}

impl Server {
    pub async fn start(config: &Config, player: Rc<dyn Player>) -> Result<Server> {
        Server::with_registry(config, player, Registry::standard()).await
    }

    pub async fn with_registry(
        config: &Config,
        player: Rc<dyn Player>,
        commands: Registry,
    ) -> Result<Server> {
        let addr = config.addr();
        let listener = TcpListener::bind(addr)
            .await
            .context(BindSnafu { addr })?;
        let local_addr = listener.local_addr().context(IoSnafu)?;

        warn!("the server starts to listen on {}", local_addr);

        let wake = Rc::new(Notify::new());
        let trigger = Trigger::new();
        let (shutdown_complete_tx, shutdown_complete_rx) = mpsc::channel(1);

        let shared = Rc::new(RefCell::new(Shared {
            player,
            password: config.password.clone(),
            commands: Rc::new(commands),
            wake: Rc::clone(&wake),
            service: None,
            connections: HashSet::new(),
            next_id: 0,
        }));

        let mut acceptor = Acceptor {
            listener,
            wake,
            shared: Rc::clone(&shared),
            shutdown: trigger.listen(),
            trigger: trigger.clone(),
            shutdown_complete_tx,
        };

        let accepting = task::spawn_local(async move {
            if let Err(err) = acceptor.run().await {
                error!("the acceptor stopped on error: {}", err);
            }
        });

        Ok(Server {
            local_addr,
            shared,
            trigger: Some(trigger),
            shutdown_complete_rx,
            acceptor: Some(accepting),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn connection_count(&self) -> usize {
        self.shared.borrow().connections.len()
    }

    pub fn has_service(&self) -> bool {
        self.shared.borrow().service.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.trigger.is_some()
    }

    /// Stops accepting and closes every open connection. Calling it again
    /// does nothing.
    pub async fn stop(&mut self) {
        let trigger = match self.trigger.take() {
            Some(trigger) => trigger,
            None => return,
        };

        info!("stopping the server");
        trigger.fire();
        drop(trigger);

        if let Some(acceptor) = self.acceptor.take() {
            let _ = acceptor.await;
        }

        // resolves once every connection task dropped its sender
        let _ = self.shutdown_complete_rx.recv().await;

        let shared = self.shared.borrow();
        assert!(
            shared.connections.is_empty(),
            "connections left after stop: {:?}",
            shared.connections
        );
        assert!(shared.service.is_none());
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Some(trigger) = self.trigger.take() {
            trigger.fire();
        }
    }
}

struct Acceptor {
    listener: TcpListener,
    wake: Rc<Notify>,
    shared: Rc<RefCell<Shared>>,
    shutdown: Shutdown,
    trigger: Trigger,
    shutdown_complete_tx: mpsc::Sender<()>,
}

impl Acceptor {
    async fn run(&mut self) -> Result<()> {
        loop {
            tokio::select! {
                res = self.listener.accept() => {
                    match res {
                        Ok((socket, addr)) => self.spawn_handler(socket, addr),
                        Err(err) => {
                            // e.g. out of file descriptors, give the system a moment
                            error!("failed to accept: {}", err);
                            tokio::time::sleep(Duration::from_millis(100)).await;
                        }
                    }
                }
                _ = self.wake.notified() => {
                    if let Some(service) = self.shared.borrow_mut().service.as_mut() {
                        service.drain_events();
                    }
                }
                _ = self.shutdown.recv() => {
                    info!("the acceptor shuts down");
                    return Ok(());
                }
            }
        }
    }

    fn spawn_handler(&self, socket: TcpStream, addr: SocketAddr) {
        let connection = self.shared.borrow_mut().open_connection();
        info!("new connection from {} as {}", addr, connection.id());

        let mut handler = Handler {
            stream: BufWriter::new(socket),
            connection,
            shared: Rc::clone(&self.shared),
            shutdown: self.trigger.listen(),
            _shutdown_complete: self.shutdown_complete_tx.clone(),
        };

        task::spawn_local(async move {
            if let Err(err) = handler.run().await {
                error!("this client has an error, disconnect it {}!", err);
            }
            handler.finish();
        });
    }
}

struct Handler {
    stream: BufWriter<TcpStream>,
    connection: Connection,
    shared: Rc<RefCell<Shared>>,
    shutdown: Shutdown,
    // dropped together with the handler, `Server::stop` waits for that
    _shutdown_complete: mpsc::Sender<()>,
}

impl Handler {
    #[instrument(skip(self), fields(id = %self.connection.id()))]
    async fn run(&mut self) -> Result<()> {
        let outbox = self.connection.outbox().clone();
        let mut buffer = BytesMut::with_capacity(4 * 1024);

        loop {
            if !outbox.is_empty() {
                let data = outbox.take();
                tokio::select! {
                    res = write_all(&mut self.stream, &data) => res?,
                    _ = self.shutdown.recv() => return Ok(()),
                }
                continue;
            }

            tokio::select! {
                res = self.stream.read_buf(&mut buffer) => {
                    if 0 == res.context(IoSnafu)? {
                        debug!("peer closed");
                        return Ok(());
                    }

                    let mut shared = self.shared.borrow_mut();
                    let service = match shared.service.as_mut() {
                        Some(service) => service,
                        None => return Ok(()),
                    };
                    self.connection.handle_read(&buffer, service);
                    buffer.clear();

                    if self.connection.is_closed() {
                        return Ok(());
                    }
                }
                _ = outbox.wait_writable() => {}
                _ = self.shutdown.recv() => return Ok(()),
            }
        }
    }

    fn finish(&mut self) {
        self.shared
            .borrow_mut()
            .close_connection(&mut self.connection);
    }
}

async fn write_all(stream: &mut BufWriter<TcpStream>, data: &[u8]) -> Result<()> {
    stream.write_all(data).await.context(IoSnafu)?;
    stream.flush().await.context(IoSnafu)?;
    Ok(())
}

pub async fn run(config: &Config, player: Rc<dyn Player>, shutdown: impl Future) -> Result<()> {
    let mut server = Server::start(config, player).await?;

    shutdown.await;
    warn!("the server shutdown");

    server.stop().await;
    Ok(())
}
