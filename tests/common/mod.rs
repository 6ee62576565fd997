//! Scripted fake PulseAudio server for the integration tests.

#![allow(dead_code)]

use std::io::Write;

use bytes::Bytes;
use noisetorch_pulse::protocol::{Command, SUBSCRIPTION_TAG};
use noisetorch_pulse::tagstruct::{PropList, TagStructReader, TagStructWriter};
use noisetorch_pulse::transport::FrameReader;
use noisetorch_pulse::{Client, ClientConfig};
use tempfile::NamedTempFile;
use tokio::io::{AsyncWriteExt, WriteHalf};
use tokio::net::UnixStream;

pub fn cookie() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&[0xA5; 256]).unwrap();
    file
}

pub fn config(cookie: &NamedTempFile) -> ClientConfig {
    ClientConfig::default()
        .with_cookie_path(cookie.path())
        .with_application_name("noisetorch-test")
        .with_request_timeout(None)
}

/// One request as seen by the server.
pub struct Received {
    pub command: u32,
    pub tag: u32,
    pub args: TagStructReader,
}

impl Received {
    pub fn is(&self, command: Command) -> bool {
        self.command == command as u32
    }
}

pub struct FakeServer {
    reader: FrameReader<tokio::io::ReadHalf<UnixStream>>,
    writer: WriteHalf<UnixStream>,
}

impl FakeServer {
    pub fn new(stream: UnixStream) -> Self {
        let (read, write) = tokio::io::split(stream);
        Self {
            reader: FrameReader::new(read),
            writer: write,
        }
    }

    pub async fn recv(&mut self) -> Received {
        let payload = self.reader.read_frame().await.unwrap();
        let mut args = TagStructReader::new(payload);
        let command = args.read_u32().unwrap();
        let tag = args.read_u32().unwrap();
        Received { command, tag, args }
    }

    /// Waits for the client to hang up.
    pub async fn expect_eof(&mut self) {
        assert!(self.reader.read_frame().await.is_err());
    }

    /// Writes only a length word, as a server announcing a frame of `len` bytes.
    pub async fn send_length(&mut self, len: u32) {
        self.writer.write_all(&len.to_be_bytes()).await.unwrap();
    }

    pub async fn send_raw(&mut self, payload: &[u8]) {
        let mut frame = Vec::with_capacity(20 + payload.len());
        frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        frame.extend_from_slice(&u32::MAX.to_be_bytes());
        frame.extend_from_slice(&[0u8; 12]);
        frame.extend_from_slice(payload);
        self.writer.write_all(&frame).await.unwrap();
    }

    pub async fn send(&mut self, command: Command, tag: u32, body: impl FnOnce(&mut TagStructWriter)) {
        let mut w = TagStructWriter::new();
        w.put_u32(command as u32).put_u32(tag);
        body(&mut w);
        let payload: Bytes = w.into_bytes().freeze();
        self.send_raw(&payload).await;
    }

    pub async fn reply(&mut self, tag: u32, body: impl FnOnce(&mut TagStructWriter)) {
        self.send(Command::Reply, tag, body).await;
    }

    pub async fn error(&mut self, tag: u32, code: u32) {
        self.send(Command::Error, tag, |w| {
            w.put_u32(code);
        })
        .await;
    }

    pub async fn event(&mut self, event: u32, index: u32) {
        self.send(Command::SubscribeEvent, SUBSCRIPTION_TAG, |w| {
            w.put_u32(event).put_u32(index);
        })
        .await;
    }

    pub async fn close(mut self) {
        let _ = self.writer.shutdown().await;
    }

    /// Answers `Auth` with `version` and `SetClientName` with `index`.
    pub async fn handshake(&mut self, version: u32, index: u32) -> PropList {
        let auth = self.recv().await;
        assert!(auth.is(Command::Auth));
        self.reply(auth.tag, |w| {
            w.put_u32(version);
        })
        .await;

        let mut name = self.recv().await;
        assert!(name.is(Command::SetClientName));
        let props = name.args.read_proplist().unwrap();
        self.reply(name.tag, |w| {
            w.put_u32(index);
        })
        .await;
        props
    }
}

/// Connects a client to a fake server that completes the handshake.
pub async fn connected(config: ClientConfig) -> (Client, FakeServer) {
    let (client_end, server_end) = UnixStream::pair().unwrap();
    let server = tokio::spawn(async move {
        let mut server = FakeServer::new(server_end);
        server.handshake(32, 7).await;
        server
    });
    let client = Client::with_stream(client_end, config).await.unwrap();
    (client, server.await.unwrap())
}

pub fn server_info(w: &mut TagStructWriter) {
    use noisetorch_pulse::tagstruct::{ChannelMap, SampleSpec};
    w.put_string("pulseaudio")
        .put_string("16.1")
        .put_string("alice")
        .put_string("desk")
        .put_sample_spec(SampleSpec {
            format: 3,
            channels: 2,
            rate: 44100,
        })
        .put_string("alsa_output.pci-0000_00_1f.3.analog-stereo")
        .put_string("alsa_input.pci-0000_00_1f.3.analog-stereo")
        .put_u32(0x1234)
        .put_channel_map(&ChannelMap::new(vec![1, 2]));
}

pub fn sink(w: &mut TagStructWriter, index: u32, name: &str, volume: u32, muted: bool) {
    use noisetorch_pulse::tagstruct::{ChannelMap, ChannelVolumes, SampleSpec};
    w.put_u32(index)
        .put_string(name)
        .put_string("Built-in Audio")
        .put_sample_spec(SampleSpec {
            format: 3,
            channels: 2,
            rate: 48000,
        })
        .put_channel_map(&ChannelMap::new(vec![1, 2]))
        .put_u32(4)
        .put_cvolume(&ChannelVolumes::uniform(2, volume))
        .put_bool(muted)
        .put_u32(index + 100)
        .put_string(&format!("{name}.monitor"))
        .put_usec(0)
        .put_string("module-alsa-card.c")
        .put_u32(0x0080)
        .put_proplist(&PropList::new())
        .put_usec(0)
        .put_volume(0x10000)
        .put_u32(0)
        .put_u32(65537)
        .put_u32(0)
        .put_u32(0)
        .put_null_string()
        .put_u8(0);
}
