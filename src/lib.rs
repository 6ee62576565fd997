//! Client for the PulseAudio native protocol over the local socket.
//!
//! ```no_run
//! # async fn run() -> noisetorch_pulse::Result<()> {
//! use noisetorch_pulse::{Client, ClientConfig};
//!
//! let client = Client::connect(ClientConfig::default()).await?;
//! let index = client
//!     .load_module("module-null-sink", "sink_name=nui_mic_denoised_out")
//!     .await?;
//! client.unload_module(index).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod model;
pub mod protocol;
pub mod session;
pub mod tagstruct;
pub mod transport;

pub use client::{Client, Updates};
pub use config::ClientConfig;
pub use error::{Error, PulseErrorCode, Result};
pub use model::{
    Card, CardPort, CardProfile, DeviceFlags, DevicePort, Module, Server, ServerFlavor,
    ServerVersion, Sink, Source,
};
pub use protocol::Command;
