use std::collections::BTreeMap;

use serde::Serialize;

/// Maximum number of channels PulseAudio supports in a map or volume.
pub const CHANNELS_MAX: usize = 32;

/// Volume of 100%.
pub const VOLUME_NORM: u32 = 0x10000;
pub const VOLUME_MUTED: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SampleSpec {
    pub format: u8,
    pub channels: u8,
    pub rate: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Timeval {
    pub secs: u32,
    pub usecs: u32,
}

/// Channel position codes, one per channel.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct ChannelMap(Vec<u8>);

impl ChannelMap {
    pub fn new(positions: Vec<u8>) -> Self {
        Self(positions)
    }

    pub fn positions(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Per-channel volumes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct ChannelVolumes(Vec<u32>);

impl ChannelVolumes {
    pub fn new(volumes: Vec<u32>) -> Self {
        Self(volumes)
    }

    /// The same volume on `channels` channels.
    pub fn uniform(channels: usize, volume: u32) -> Self {
        Self(vec![volume; channels.clamp(1, CHANNELS_MAX)])
    }

    pub fn volumes(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// String-keyed metadata attached to most server objects.
///
/// Keys are kept sorted so encoding is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct PropList(BTreeMap<String, String>);

impl PropList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropList {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A stream format a sink or source accepts. The encoding code is kept raw.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FormatInfo {
    pub encoding: u8,
    pub props: PropList,
}
