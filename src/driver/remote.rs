//! Loopback TCP transport.
//!
//! Clients send newline-delimited JSON messages and receive newline-delimited
//! JSON replies on the same connection:
//!
//! ```text
//! -> {"type":"landmarks","width":640,"height":480,"landmarks":[[x,y,z], ...]}
//! <- {"type":"gesture_detected","gesture":"next"}      (only when dispatched)
//! <- {"type":"processed","frame":12}
//! -> {"type":"action","action":"volume up"}
//! <- {"type":"action_performed","action":"volume up"}
//! ```
//!
//! Every connection owns one `GestureSession`, so motion history and cooldown
//! never leak between clients. Malformed messages produce an `error` reply and
//! the connection stays open. A message over 64 KiB is answered with an error
//! as soon as the limit is crossed, and its remaining bytes are dropped.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::landmarks::LandmarkRecord;
use crate::playback::ActionDispatcher;
use crate::recognize::GestureLabel;
use crate::session::{FrameOutcome, GestureSession, SessionSettings};

const MAX_MESSAGE_BYTES: usize = 64 * 1024;
const ACCEPT_POLL: Duration = Duration::from_millis(50);
const READ_POLL: Duration = Duration::from_millis(200);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub addr: String,
    pub session: SessionSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8765".to_string(),
            session: SessionSettings::default(),
        }
    }
}

/// Inbound message.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Landmarks(LandmarkRecord),
    /// Manual trigger; skips recognition and the cooldown gate.
    Action { action: String },
}

/// Outbound message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    GestureDetected { gesture: GestureLabel },
    Processed { frame: u64 },
    ActionPerformed { action: GestureLabel },
    Error { message: String },
}

impl ServerMessage {
    fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub struct ServerHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// Stop accepting, close every session and wait for the threads.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("gesture server thread panicked"))?;
        }
        Ok(())
    }
}

pub struct GestureServer {
    cfg: ServerConfig,
    dispatcher: ActionDispatcher,
}

impl GestureServer {
    pub fn new(cfg: ServerConfig, dispatcher: ActionDispatcher) -> Self {
        Self { cfg, dispatcher }
    }

    pub fn spawn(self) -> Result<ServerHandle> {
        let configured_addr: SocketAddr = self
            .cfg
            .addr
            .parse()
            .with_context(|| format!("invalid server address '{}'", self.cfg.addr))?;
        let listener = TcpListener::bind(configured_addr)
            .with_context(|| format!("bind {}", configured_addr))?;
        let addr = listener.local_addr()?;
        if configured_addr.ip().is_loopback() && !addr.ip().is_loopback() {
            return Err(anyhow!(
                "server configured for loopback address '{}', but bound to non-loopback address '{}'",
                configured_addr,
                addr
            ));
        }
        listener.set_nonblocking(true)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let join = std::thread::spawn(move || {
            if let Err(err) = run_server(listener, self.cfg, self.dispatcher, shutdown_thread) {
                log::error!("gesture server stopped: {}", err);
            }
        });

        Ok(ServerHandle {
            addr,
            shutdown,
            join: Some(join),
        })
    }
}

fn run_server(
    listener: TcpListener,
    cfg: ServerConfig,
    dispatcher: ActionDispatcher,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let mut sessions: Vec<JoinHandle<()>> = Vec::new();
    let result = loop {
        if shutdown.load(Ordering::SeqCst) {
            break Ok(());
        }
        match listener.accept() {
            Ok((stream, peer)) => {
                let dispatcher = dispatcher.clone();
                let shutdown = shutdown.clone();
                let settings = cfg.session;
                sessions.push(std::thread::spawn(move || {
                    if let Err(err) = handle_connection(stream, settings, &dispatcher, &shutdown) {
                        log::warn!("session {} closed with error: {}", peer, err);
                    }
                }));
                sessions.retain(|handle| !handle.is_finished());
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(ACCEPT_POLL);
                continue;
            }
            Err(err) => break Err(err.into()),
        }
    };

    shutdown.store(true, Ordering::SeqCst);
    for handle in sessions {
        if handle.join().is_err() {
            log::error!("gesture session thread panicked");
        }
    }
    result
}

fn handle_connection(
    stream: TcpStream,
    settings: SessionSettings,
    dispatcher: &ActionDispatcher,
    shutdown: &AtomicBool,
) -> Result<()> {
    let peer = stream.peer_addr()?;
    let local = stream.local_addr()?;
    let mut writer = stream.try_clone()?;
    if local.ip().is_loopback() && !peer.ip().is_loopback() {
        write_message(&mut writer, &ServerMessage::error("forbidden"))?;
        return Ok(());
    }
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(READ_POLL))?;

    log::info!("session opened for {}", peer);
    let mut session = GestureSession::new(settings);
    let mut reader = BufReader::new(stream);
    let mut line: Vec<u8> = Vec::with_capacity(4096);
    // Set after an oversized message until its terminating newline is seen.
    let mut discarding = false;

    while !shutdown.load(Ordering::SeqCst) {
        // Never buffer more than one byte past the cap.
        let budget = (MAX_MESSAGE_BYTES + 1).saturating_sub(line.len()) as u64;
        match reader.by_ref().take(budget).read_until(b'\n', &mut line) {
            Ok(0) => {
                // EOF; a final message may lack its newline.
                if !discarding && !line.is_empty() {
                    for reply in replies_for_line(&line, &mut session, dispatcher) {
                        write_message(&mut writer, &reply)?;
                    }
                }
                break;
            }
            Ok(_) => {}
            Err(err)
                if matches!(
                    err.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                // Partial data stays in `line` until the newline arrives.
                continue;
            }
            Err(err) => return Err(err.into()),
        }

        let complete = line.last() == Some(&b'\n');
        if discarding {
            line.clear();
            discarding = !complete;
            continue;
        }
        if !complete {
            if line.len() > MAX_MESSAGE_BYTES {
                log::warn!("message from {} exceeds {} bytes", peer, MAX_MESSAGE_BYTES);
                write_message(&mut writer, &ServerMessage::error("message too large"))?;
                line.clear();
                discarding = true;
            }
            continue;
        }
        for reply in replies_for_line(&line, &mut session, dispatcher) {
            write_message(&mut writer, &reply)?;
        }
        line.clear();
    }

    let stats = session.stats();
    log::info!(
        "session closed for {}: frames={} gestures={} dispatched={}",
        peer,
        stats.frames_processed,
        stats.gestures_recognized,
        stats.gestures_admitted
    );
    Ok(())
}

fn replies_for_line(
    line: &[u8],
    session: &mut GestureSession,
    dispatcher: &ActionDispatcher,
) -> Vec<ServerMessage> {
    match std::str::from_utf8(line) {
        Ok(text) => handle_message(text.trim(), session, dispatcher),
        Err(_) => {
            log::warn!("rejected client message: invalid utf-8");
            vec![ServerMessage::error("invalid utf-8")]
        }
    }
}

/// Replies for one inbound line.
fn handle_message(
    raw: &str,
    session: &mut GestureSession,
    dispatcher: &ActionDispatcher,
) -> Vec<ServerMessage> {
    if raw.is_empty() {
        return Vec::new();
    }
    let message = match serde_json::from_str::<ClientMessage>(raw) {
        Ok(message) => message,
        Err(err) => {
            log::warn!("rejected client message: {}", err);
            return vec![ServerMessage::error(format!("invalid message: {}", err))];
        }
    };

    match message {
        ClientMessage::Landmarks(record) => {
            let frame = match record.into_frame() {
                Ok(frame) => frame,
                Err(err) => {
                    log::warn!("rejected landmark frame: {}", err);
                    return vec![ServerMessage::error(err.to_string())];
                }
            };
            let mut replies = Vec::with_capacity(2);
            match session.process(&frame, Instant::now(), dispatcher) {
                FrameOutcome::Dispatched(gesture) => {
                    replies.push(ServerMessage::GestureDetected { gesture })
                }
                FrameOutcome::DispatchFailed(gesture, err) => {
                    replies.push(ServerMessage::error(format!("{}: {}", gesture, err)))
                }
                FrameOutcome::Idle | FrameOutcome::Suppressed(_) => {}
            }
            replies.push(ServerMessage::Processed {
                frame: session.stats().frames_processed,
            });
            replies
        }
        ClientMessage::Action { action } => {
            let label = match action.parse::<GestureLabel>() {
                Ok(label) => label,
                Err(err) => {
                    log::warn!("rejected manual action: {}", err);
                    return vec![ServerMessage::error(err.to_string())];
                }
            };
            match dispatcher.dispatch(label) {
                Ok(()) => {
                    log::info!("manual action '{}' dispatched", label);
                    vec![ServerMessage::ActionPerformed { action: label }]
                }
                Err(err) => {
                    log::warn!("manual action '{}' failed: {}", label, err);
                    vec![ServerMessage::error(err.to_string())]
                }
            }
        }
    }
}

fn write_message(stream: &mut TcpStream, message: &ServerMessage) -> Result<()> {
    let mut payload = serde_json::to_vec(message)?;
    payload.push(b'\n');
    stream.write_all(&payload)?;
    stream.flush()?;
    Ok(())
}
