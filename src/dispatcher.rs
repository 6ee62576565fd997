//! Request/reply multiplexing over the single connection.
//!
//! One task pumps outgoing frames, another pumps incoming frames. The pending
//! table, the tag cursor, the update channel and the close flag live behind a
//! mutex that is held only for tag allocation and table mutation.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot, watch};

use crate::error::{Error, Result};
use crate::protocol::{self, Command, SUBSCRIPTION_TAG};
use crate::tagstruct::TagStructReader;
use crate::transport::{patch_tag, FrameReader, FrameWriter, Request};

type Reply = Result<Bytes>;

struct Pending {
    command: Command,
    reply: oneshot::Sender<Reply>,
}

#[derive(Default)]
struct State {
    pending: HashMap<u32, Pending>,
    /// Tags whose waiter gave up; a late reply for them is dropped.
    stale: HashSet<u32>,
    cursor: u32,
    updates: Option<mpsc::Sender<()>>,
    closed: bool,
}

impl State {
    fn next_tag(&mut self) -> u32 {
        loop {
            let tag = self.cursor;
            self.cursor = self.cursor.wrapping_add(1);
            if self.cursor == SUBSCRIPTION_TAG {
                self.cursor = 0;
            }
            if tag != SUBSCRIPTION_TAG
                && !self.pending.contains_key(&tag)
                && !self.stale.contains(&tag)
            {
                return tag;
            }
        }
    }
}

struct Core {
    state: Mutex<State>,
    shutdown: watch::Sender<bool>,
}

impl Core {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reserve(&self, command: Command, reply: oneshot::Sender<Reply>) -> Result<u32> {
        let mut state = self.state();
        if state.closed {
            return Err(Error::ConnectionClosed);
        }
        let tag = state.next_tag();
        state.pending.insert(tag, Pending { command, reply });
        Ok(tag)
    }

    fn abandon(&self, tag: u32) {
        let mut state = self.state();
        if state.pending.remove(&tag).is_some() && !state.closed {
            state.stale.insert(tag);
        }
    }

    /// Drops a tag whose frame never reached the writer.
    fn release(&self, tag: u32) {
        self.state().pending.remove(&tag);
    }

    fn fail(&self, tag: u32, error: Error) {
        let pending = self.state().pending.remove(&tag);
        if let Some(p) = pending {
            let _ = p.reply.send(Err(error));
        }
    }

    /// Handles one incoming payload. An error return is fatal for the session.
    fn route(&self, payload: Bytes) -> Result<()> {
        let mut r = TagStructReader::new(payload);
        let command = r.read_u32()?;
        let tag = r.read_u32()?;

        if command == Command::SubscribeEvent as u32 {
            if tag != SUBSCRIPTION_TAG {
                return Err(Error::violation(format!(
                    "subscription event with request tag {tag}"
                )));
            }
            if let (Ok(event), Ok(index)) = (r.read_u32(), r.read_u32()) {
                let (facility, kind) = protocol::split_event(event);
                log::debug!("subscription event: {:?} {:?} #{}", facility, kind, index);
            }
            if let Some(updates) = &self.state().updates {
                // capacity 1: a full channel already says "something changed"
                let _ = updates.try_send(());
            }
            return Ok(());
        }

        let pending = {
            let mut state = self.state();
            match state.pending.remove(&tag) {
                Some(p) => p,
                None if state.stale.remove(&tag) => {
                    log::debug!("discarding stale reply for tag {}", tag);
                    return Ok(());
                }
                None => {
                    return Err(Error::violation(format!(
                        "no pending request for tag {tag} (command {command})"
                    )));
                }
            }
        };

        match Command::from_u32(command) {
            Some(Command::Reply) => {
                let _ = pending.reply.send(Ok(r.into_remaining()));
                Ok(())
            }
            Some(Command::Error) => match r.read_u32() {
                Ok(code) => {
                    let _ = pending.reply.send(Err(Error::Pulse {
                        command: pending.command,
                        code,
                    }));
                    Ok(())
                }
                Err(e) => {
                    let _ = pending.reply.send(Err(e.for_waiter()));
                    Err(e)
                }
            },
            _ => {
                let msg = format!(
                    "expected Reply or Error for {:?} but got command {}",
                    pending.command, command
                );
                let _ = pending.reply.send(Err(Error::violation(msg.clone())));
                Err(Error::violation(msg))
            }
        }
    }

    /// Ends the session: every waiter is completed and new requests are refused.
    fn terminate(&self, reason: Error) {
        let waiters = {
            let mut state = self.state();
            if state.closed {
                return;
            }
            state.closed = true;
            state.updates = None;
            state.stale.clear();
            std::mem::take(&mut state.pending)
        };
        match reason {
            Error::ConnectionClosed => log::info!("PulseAudio connection closed"),
            ref fatal => log::error!("PulseAudio session terminated: {}", fatal),
        }
        for (_, p) in waiters {
            let _ = p.reply.send(Err(reason.for_waiter()));
        }
        self.shutdown.send_replace(true);
    }
}

struct Outgoing {
    tag: u32,
    frame: Bytes,
}

/// Owns both halves of the connection through its two pump tasks.
pub struct Dispatcher {
    core: Arc<Core>,
    outgoing: mpsc::Sender<Outgoing>,
}

impl Dispatcher {
    /// Spawns the pump tasks. Must be called inside a tokio runtime.
    pub fn start<R, W>(read: R, write: W, updates: mpsc::Sender<()>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (shutdown, _) = watch::channel(false);
        let core = Arc::new(Core {
            state: Mutex::new(State {
                updates: Some(updates),
                ..State::default()
            }),
            shutdown,
        });
        let (outgoing, rx) = mpsc::channel::<Outgoing>(64);

        let stop_writer = core.shutdown.subscribe();
        let stop_reader = core.shutdown.subscribe();
        tokio::spawn(pump_outgoing(FrameWriter::new(write), rx, stop_writer, core.clone()));
        tokio::spawn(pump_incoming(FrameReader::new(read), stop_reader, core.clone()));

        Self { core, outgoing }
    }

    /// Sends `request` and waits for its reply body (everything after
    /// command and tag).
    pub async fn request(&self, request: Request, timeout: Option<Duration>) -> Result<Bytes> {
        let command = request.command();
        let mut frame = request.into_frame()?;

        let (tx, rx) = oneshot::channel();
        let tag = self.core.reserve(command, tx)?;
        patch_tag(&mut frame, tag);

        let mut guard = PendingGuard {
            core: &self.core,
            tag,
            armed: true,
            queued: false,
        };

        let out = Outgoing {
            tag,
            frame: frame.freeze(),
        };
        if self.outgoing.send(out).await.is_err() {
            return Err(Error::ConnectionClosed);
        }
        guard.queued = true;

        let reply = match timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(reply) => reply,
                Err(_) => {
                    log::warn!("{:?} (tag {}) timed out after {:?}", command, tag, limit);
                    return Err(Error::Timeout { command });
                }
            },
            None => rx.await,
        };
        // the entry is gone once the channel resolved
        guard.armed = false;
        reply.unwrap_or(Err(Error::ConnectionClosed))
    }

    pub fn close(&self) {
        self.core.terminate(Error::ConnectionClosed);
    }

    pub fn is_closed(&self) -> bool {
        self.core.state().closed
    }

    pub fn pending_requests(&self) -> usize {
        self.core.state().pending.len()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.close();
    }
}

/// Releases the tag of a waiter that stopped waiting (timeout or a dropped
/// future). Once the frame is queued a reply may still come, so the tag
/// goes stale instead of free.
struct PendingGuard<'a> {
    core: &'a Core,
    tag: u32,
    armed: bool,
    queued: bool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        match (self.armed, self.queued) {
            (false, _) => {}
            (true, true) => self.core.abandon(self.tag),
            (true, false) => self.core.release(self.tag),
        }
    }
}

async fn pump_outgoing<W: AsyncWrite + Unpin>(
    mut writer: FrameWriter<W>,
    mut rx: mpsc::Receiver<Outgoing>,
    mut shutdown: watch::Receiver<bool>,
    core: Arc<Core>,
) {
    loop {
        tokio::select! {
            out = rx.recv() => {
                let Some(out) = out else { break };
                if let Err(e) = writer.write_frame(&out.frame).await {
                    log::error!("couldn't send request (tag {}): {}", out.tag, e);
                    core.fail(out.tag, Error::Transport(e.to_string()));
                    core.terminate(Error::ConnectionClosed);
                    break;
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    writer.shutdown().await;
}

async fn pump_incoming<R: AsyncRead + Unpin>(
    mut reader: FrameReader<R>,
    mut shutdown: watch::Receiver<bool>,
    core: Arc<Core>,
) {
    loop {
        let frame = tokio::select! {
            frame = reader.read_frame() => frame,
            _ = shutdown.changed() => return,
        };
        if let Err(e) = frame.and_then(|payload| core.route(payload)) {
            core.terminate(e);
            return;
        }
    }
}
