use std::fmt;

use serde::Serialize;

use super::Record;
use crate::error::Result;
use crate::tagstruct::{ChannelMap, SampleSpec, TagStructReader};

/// Reply to `GetServerInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Server {
    pub package_name: String,
    pub package_version: String,
    pub user: String,
    pub hostname: String,
    pub sample_spec: SampleSpec,
    pub default_sink: String,
    pub default_source: String,
    pub cookie: u32,
    pub channel_map: ChannelMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ServerFlavor {
    PulseAudio,
    PipeWire,
}

impl fmt::Display for ServerFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerFlavor::PulseAudio => write!(f, "PulseAudio"),
            ServerFlavor::PipeWire => write!(f, "PipeWire"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Server {
    /// PipeWire's pulse server puts its own name in the package name.
    pub fn flavor(&self) -> ServerFlavor {
        if self.package_name.contains("PipeWire") {
            ServerFlavor::PipeWire
        } else {
            ServerFlavor::PulseAudio
        }
    }

    /// Version of the actual sound server, if it can be parsed.
    ///
    /// PipeWire reports e.g. `PulseAudio (on PipeWire 0.3.65)` as package
    /// name; PulseAudio reports e.g. `16.1` as package version.
    pub fn version(&self) -> Option<ServerVersion> {
        match self.flavor() {
            ServerFlavor::PipeWire => {
                let (_, rest) = self.package_name.split_once("on PipeWire ")?;
                // PipeWire always reports all three parts
                let (major, minor, patch) = parse_version(rest)?;
                Some(ServerVersion {
                    major,
                    minor,
                    patch: patch?,
                })
            }
            ServerFlavor::PulseAudio => {
                let start = self.package_version.find(|c: char| c.is_ascii_digit())?;
                let (major, minor, patch) = parse_version(&self.package_version[start..])?;
                Some(ServerVersion {
                    major,
                    minor,
                    patch: patch.unwrap_or(0),
                })
            }
        }
    }
}

/// Parses a leading `major.minor[.patch]`.
fn parse_version(s: &str) -> Option<(u32, u32, Option<u32>)> {
    let mut parts = s.splitn(3, '.');
    let major = leading_number(parts.next()?)?;
    let minor = leading_number(parts.next()?)?;
    let patch = parts.next().and_then(leading_number);
    Some((major, minor, patch))
}

fn leading_number(s: &str) -> Option<u32> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s[..end].parse().ok()
}

impl Record for Server {
    fn read(r: &mut TagStructReader) -> Result<Self> {
        Ok(Self {
            package_name: r.read_string()?,
            package_version: r.read_string()?,
            user: r.read_string()?,
            hostname: r.read_string()?,
            sample_spec: r.read_sample_spec()?,
            default_sink: r.read_string()?,
            default_source: r.read_string()?,
            cookie: r.read_u32()?,
            channel_map: r.read_channel_map()?,
        })
    }
}
