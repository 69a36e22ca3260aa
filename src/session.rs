//! Per-connection session
//!
//! Handles individual client connections: registration, the line read loop,
//! routing commands and chat lines, and teardown when the stream ends.

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::broadcast::Broadcaster;
use crate::client::Client;
use crate::command::{CommandDispatcher, Scope};
use crate::error::SessionError;
use crate::message::{welcome, Author, COMMAND_MARKER};
use crate::registry::Registry;
use crate::types::ClientId;

/// One frame read from the connection
#[derive(Debug, PartialEq, Eq)]
enum Frame {
    /// A trimmed input line
    Line(String),
    /// Clean end of stream
    Closed,
}

/// Whether the read loop keeps going after a line
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// Session for one accepted connection
pub struct Session {
    id: ClientId,
    registry: Arc<Registry>,
    dispatcher: CommandDispatcher,
    broadcaster: Broadcaster,
    sink_capacity: usize,
}

impl Session {
    pub fn new(id: ClientId, registry: Arc<Registry>, sink_capacity: usize) -> Self {
        Self {
            id,
            dispatcher: CommandDispatcher::new(Arc::clone(&registry)),
            broadcaster: Broadcaster::new(Arc::clone(&registry)),
            registry,
            sink_capacity,
        }
    }

    /// Drive the connection until it closes, exits or the server shuts down
    ///
    /// Registration failure closes the stream immediately and is returned as
    /// an error; everything after that is handled inside the session.
    pub async fn run<S>(
        self,
        stream: S,
        peer: String,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), SessionError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);

        // The writer task is the only thing that touches the write half
        let (sink, lines) = mpsc::channel::<String>(self.sink_capacity);
        let write_task = tokio::spawn(write_loop(write_half, lines));

        let client = match self.registry.register_client(self.id, sink) {
            Ok(client) => client,
            Err(e) => {
                warn!("Rejecting connection from {}: {}", peer, e);
                let _ = write_task.await;
                return Err(e.into());
            }
        };
        info!("Client {} connected from {}", self.id, peer);

        if client.write_string(welcome(self.id)).await.is_err() {
            debug!("Could not greet {}", self.id);
        }

        let mut reader = BufReader::new(read_half);
        let mut buf = Vec::new();
        loop {
            let frame = tokio::select! {
                frame = read_frame(&mut reader, &mut buf) => frame,
                _ = shutdown.changed() => {
                    debug!("Shutdown signalled, ending session for {}", self.id);
                    break;
                }
            };

            match frame {
                Ok(Frame::Line(line)) => {
                    if self.handle_line(&client, &line).await == Flow::Exit {
                        break;
                    }
                }
                Ok(Frame::Closed) => {
                    debug!("Client {} closed the stream", self.id);
                    break;
                }
                Err(SessionError::Io(e)) if is_fatal(&e) => {
                    debug!("Connection error for {}: {}", self.id, e);
                    break;
                }
                Err(e) => {
                    warn!("Read error from {}: {}", self.id, e);
                    let (me, _) = self.audience(&client);
                    self.write_private(&me, &format!("Unreadable input: {e}"))
                        .await;
                }
            }
        }

        if let Some(departure) = self.registry.unregister_client(self.id) {
            self.broadcaster.announce_departure(departure);
        }

        // The writer flushes and shuts the stream down once every sink handle is gone
        drop(client);
        let _ = write_task.await;

        info!("Client {} disconnected", self.id);
        Ok(())
    }

    async fn handle_line(&self, client: &Client, line: &str) -> Flow {
        if line.is_empty() {
            return Flow::Continue;
        }

        if !line.starts_with(COMMAND_MARKER) {
            let (me, members) = self.audience(client);
            if me.current_room.is_some() {
                self.broadcaster.deliver(line, &me, members).await;
            } else {
                self.write_private(&me, line).await;
            }
            return Flow::Continue;
        }

        let reply = self.dispatcher.dispatch(self.id, line);
        if let Some(departure) = reply.departure {
            self.broadcaster.announce_departure(departure);
        }

        let (me, members) = self.audience(client);
        match reply.scope {
            Scope::Private => self.write_private(&me, &reply.text).await,
            Scope::Room => {
                self.broadcaster.deliver(&reply.text, &me, members).await;
            }
        }

        if reply.terminate {
            Flow::Exit
        } else {
            Flow::Continue
        }
    }

    /// Latest registry snapshot of this session's client and its room
    fn audience(&self, fallback: &Client) -> (Client, Vec<Client>) {
        self.registry
            .audience(self.id)
            .unwrap_or_else(|| (fallback.clone(), Vec::new()))
    }

    async fn write_private(&self, me: &Client, text: &str) {
        if let Err(e) = me.write_response(text, &Author::Own).await {
            debug!("Reply to {} dropped: {}", self.id, e);
        }
    }
}

/// Handle a new TCP connection
///
/// Assigns a fresh client id and runs a [`Session`] on the stream.
pub async fn handle_connection(
    stream: TcpStream,
    registry: Arc<Registry>,
    sink_capacity: usize,
    shutdown: watch::Receiver<bool>,
) -> Result<(), SessionError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    Session::new(ClientId::new(), registry, sink_capacity)
        .run(stream, peer_addr, shutdown)
        .await
}

async fn read_frame<R>(reader: &mut R, buf: &mut Vec<u8>) -> Result<Frame, SessionError>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(Frame::Closed);
    }
    let line = std::str::from_utf8(buf)?;
    Ok(Frame::Line(line.trim().to_string()))
}

/// Errors after which the stream can never yield another line
fn is_fatal(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
    )
}

async fn write_loop<W>(mut writer: W, mut lines: mpsc::Receiver<String>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = lines.recv().await {
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            debug!("Send failed, ending write task: {}", e);
            break;
        }
        if writer.flush().await.is_err() {
            break;
        }
    }
    debug!("Write task ended");

    let _ = writer.shutdown().await;
}
