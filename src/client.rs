//! The operations a caller performs against the server.
//!
//! A [`Client`] is only handed out after authentication and identity
//! succeeded. Every method can be called concurrently from many tasks
//! through a shared reference; each waits for the reply to its own request.

use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixStream;
use tokio::sync::mpsc;

use crate::config::ClientConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::model::{self, Card, Module, Server, Sink, Source};
use crate::protocol::{Command, INVALID_INDEX, SUBSCRIPTION_MASK_ALL};
use crate::session;
use crate::tagstruct::{ChannelVolumes, TagStructReader, VOLUME_NORM};
use crate::transport::Request;

pub struct Client {
    dispatcher: Dispatcher,
    config: ClientConfig,
    protocol_version: u32,
    client_index: u32,
    updates: Mutex<Option<mpsc::Receiver<()>>>,
}

/// Coalesced change notifications: each wake-up means "at least one object
/// changed since the last one", never which.
pub struct Updates {
    rx: mpsc::Receiver<()>,
}

impl Updates {
    /// Waits for the next change. Returns `false` once the session is over.
    pub async fn changed(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }

    /// Takes a pending notification without waiting.
    pub fn try_changed(&mut self) -> Result<bool> {
        match self.rx.try_recv() {
            Ok(()) => Ok(true),
            Err(mpsc::error::TryRecvError::Empty) => Ok(false),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(Error::ConnectionClosed),
        }
    }
}

impl Client {
    /// Connects to the configured socket and runs the handshake.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let path = config.resolved_socket_path();
        log::debug!("connecting to {}", path.display());
        let stream = UnixStream::connect(&path)
            .await
            .map_err(|source| Error::Connect { path, source })?;
        Self::with_stream(stream, config).await
    }

    /// Runs the handshake over an already connected stream.
    pub async fn with_stream<S>(stream: S, config: ClientConfig) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read, write) = tokio::io::split(stream);
        let (updates_tx, updates_rx) = mpsc::channel(1);
        let dispatcher = Dispatcher::start(read, write, updates_tx);

        let handshake = async {
            let version = session::authenticate(&dispatcher, &config).await?;
            let index = session::announce(&dispatcher, &config).await?;
            Ok::<_, Error>((version, index))
        };
        let (protocol_version, client_index) = match handshake.await {
            Ok(v) => v,
            Err(e) => {
                dispatcher.close();
                return Err(e);
            }
        };
        log::info!(
            "connected to PulseAudio: protocol version {}, client index {}",
            protocol_version,
            client_index
        );

        Ok(Self {
            dispatcher,
            config,
            protocol_version,
            client_index,
            updates: Mutex::new(Some(updates_rx)),
        })
    }

    pub fn protocol_version(&self) -> u32 {
        self.protocol_version
    }

    /// Index the server assigned to this client.
    pub fn client_index(&self) -> u32 {
        self.client_index
    }

    pub fn is_connected(&self) -> bool {
        !self.dispatcher.is_closed()
    }

    /// Ends the session. In-flight and later calls fail with `ConnectionClosed`.
    pub fn close(&self) {
        self.dispatcher.close();
    }

    pub fn pending_requests(&self) -> usize {
        self.dispatcher.pending_requests()
    }

    async fn call(&self, request: Request) -> Result<Bytes> {
        self.dispatcher
            .request(request, self.config.request_timeout)
            .await
    }

    async fn call_simple(&self, request: Request) -> Result<()> {
        self.call(request).await.map(drop)
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    pub async fn sinks(&self) -> Result<Vec<Sink>> {
        model::read_list(self.call(Request::new(Command::GetSinkInfoList)).await?)
    }

    pub async fn sources(&self) -> Result<Vec<Source>> {
        model::read_list(self.call(Request::new(Command::GetSourceInfoList)).await?)
    }

    pub async fn cards(&self) -> Result<Vec<Card>> {
        model::read_list(self.call(Request::new(Command::GetCardInfoList)).await?)
    }

    pub async fn modules(&self) -> Result<Vec<Module>> {
        model::read_list(self.call(Request::new(Command::GetModuleInfoList)).await?)
    }

    pub async fn server_info(&self) -> Result<Server> {
        model::read_one(self.call(Request::new(Command::GetServerInfo)).await?)
    }

    /// First loaded module called `name` whose argument contains `fragment`.
    pub async fn find_module(&self, name: &str, fragment: &str) -> Result<Option<Module>> {
        Ok(self
            .modules()
            .await?
            .into_iter()
            .find(|m| m.matches(name, fragment)))
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    pub async fn set_default_sink(&self, name: &str) -> Result<()> {
        let mut req = Request::new(Command::SetDefaultSink);
        req.args().put_string(name);
        self.call_simple(req).await
    }

    pub async fn set_default_source(&self, name: &str) -> Result<()> {
        let mut req = Request::new(Command::SetDefaultSource);
        req.args().put_string(name);
        self.call_simple(req).await
    }

    pub async fn set_card_profile(&self, card_index: u32, profile: &str) -> Result<()> {
        let mut req = Request::new(Command::SetCardProfile);
        req.args()
            .put_u32(card_index)
            .put_null_string()
            .put_string(profile);
        self.call_simple(req).await
    }

    /// Loads a module; `argument` is passed through untouched.
    pub async fn load_module(&self, name: &str, argument: &str) -> Result<u32> {
        let mut req = Request::new(Command::LoadModule);
        req.args().put_string(name).put_string(argument);
        let index = TagStructReader::new(self.call(req).await?).read_u32()?;
        log::info!("loaded {} as module #{}", name, index);
        Ok(index)
    }

    pub async fn unload_module(&self, index: u32) -> Result<()> {
        let mut req = Request::new(Command::UnloadModule);
        req.args().put_u32(index);
        self.call_simple(req).await?;
        log::info!("unloaded module #{}", index);
        Ok(())
    }

    pub async fn set_sink_volume(&self, name: &str, volume: &ChannelVolumes) -> Result<()> {
        let mut req = Request::new(Command::SetSinkVolume);
        req.args()
            .put_u32(INVALID_INDEX)
            .put_string(name)
            .put_cvolume(volume);
        self.call_simple(req).await
    }

    pub async fn set_sink_mute(&self, name: &str, mute: bool) -> Result<()> {
        self.set_mute_by_name(Command::SetSinkMute, name, mute).await
    }

    pub async fn set_source_mute(&self, name: &str, mute: bool) -> Result<()> {
        self.set_mute_by_name(Command::SetSourceMute, name, mute).await
    }

    async fn set_mute_by_name(&self, command: Command, name: &str, mute: bool) -> Result<()> {
        let mut req = Request::new(command);
        req.args().put_u32(INVALID_INDEX).put_string(name).put_bool(mute);
        self.call_simple(req).await
    }

    // ---------------------------------------------------------------------
    // Default sink shortcuts
    // ---------------------------------------------------------------------

    async fn default_sink(&self) -> Result<Sink> {
        let server = self.server_info().await?;
        self.sinks()
            .await?
            .into_iter()
            .find(|s| s.name == server.default_sink)
            .ok_or(Error::NotFound {
                kind: "sink",
                name: server.default_sink,
            })
    }

    /// Volume of the default sink's first channel, 1.0 being 100%.
    pub async fn volume(&self) -> Result<f32> {
        let sink = self.default_sink().await?;
        let first = sink.volume.volumes().first().copied().unwrap_or(0);
        Ok(first as f32 / VOLUME_NORM as f32)
    }

    /// Sets every channel of the default sink to `volume` (1.0 being 100%).
    pub async fn set_volume(&self, volume: f32) -> Result<()> {
        let sink = self.default_sink().await?;
        let raw = (volume.max(0.0) * VOLUME_NORM as f32).round() as u32;
        let volumes = ChannelVolumes::uniform(sink.volume.len(), raw);
        self.set_sink_volume(&sink.name, &volumes).await
    }

    pub async fn mute(&self) -> Result<bool> {
        Ok(self.default_sink().await?.muted)
    }

    pub async fn set_mute(&self, mute: bool) -> Result<()> {
        let server = self.server_info().await?;
        self.set_sink_mute(&server.default_sink, mute).await
    }

    /// Flips the default sink's mute state and returns the new state.
    pub async fn toggle_mute(&self) -> Result<bool> {
        let sink = self.default_sink().await?;
        self.set_sink_mute(&sink.name, !sink.muted).await?;
        Ok(!sink.muted)
    }

    // ---------------------------------------------------------------------
    // Subscription
    // ---------------------------------------------------------------------

    /// Subscribes to every facility and hands out the update channel. There
    /// is one channel per client.
    pub async fn subscribe(&self) -> Result<Updates> {
        let rx = self
            .updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(Error::AlreadySubscribed)?;
        let mut held = HeldReceiver {
            slot: &self.updates,
            rx: Some(rx),
        };

        let mut req = Request::new(Command::Subscribe);
        req.args().put_u32(SUBSCRIPTION_MASK_ALL);
        self.call_simple(req).await?;

        let rx = held.rx.take().ok_or(Error::AlreadySubscribed)?;
        Ok(Updates { rx })
    }
}

/// Puts the update receiver back unless the subscription went through,
/// including when the `subscribe` future is dropped mid-request.
struct HeldReceiver<'a> {
    slot: &'a Mutex<Option<mpsc::Receiver<()>>>,
    rx: Option<mpsc::Receiver<()>>,
}

impl Drop for HeldReceiver<'_> {
    fn drop(&mut self) {
        if let Some(rx) = self.rx.take() {
            *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(rx);
        }
    }
}
