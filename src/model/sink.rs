use serde::Serialize;

use super::Record;
use crate::error::Result;
use crate::tagstruct::{
    ChannelMap, ChannelVolumes, FormatInfo, PropList, SampleSpec, TagStructReader,
};

/// Capability bits of a sink or source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct DeviceFlags(pub u32);

impl DeviceFlags {
    pub const HW_VOLUME_CTRL: u32 = 0x0001;
    pub const LATENCY: u32 = 0x0002;
    pub const HARDWARE: u32 = 0x0004;
    pub const NETWORK: u32 = 0x0008;
    pub const HW_MUTE_CTRL: u32 = 0x0010;
    pub const DECIBEL_VOLUME: u32 = 0x0020;
    pub const FLAT_VOLUME: u32 = 0x0040;
    pub const DYNAMIC_LATENCY: u32 = 0x0080;
    pub const SET_FORMATS: u32 = 0x0100;

    pub fn contains(self, bit: u32) -> bool {
        self.0 & bit == bit
    }

    pub fn is_hardware(self) -> bool {
        self.contains(Self::HARDWARE)
    }

    /// Devices without dynamic latency need a larger fixed loopback latency.
    pub fn has_dynamic_latency(self) -> bool {
        self.contains(Self::DYNAMIC_LATENCY)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DevicePort {
    pub name: String,
    pub description: String,
    pub priority: u32,
    pub available: u32,
}

impl Record for DevicePort {
    fn read(r: &mut TagStructReader) -> Result<Self> {
        Ok(Self {
            name: r.read_string()?,
            description: r.read_string()?,
            priority: r.read_u32()?,
            available: r.read_u32()?,
        })
    }
}

/// A playback device.
///
/// `monitor_index`/`monitor_name` name the source monitoring this sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sink {
    pub index: u32,
    pub name: String,
    pub description: String,
    pub sample_spec: SampleSpec,
    pub channel_map: ChannelMap,
    pub owner_module: u32,
    pub volume: ChannelVolumes,
    pub muted: bool,
    pub monitor_index: u32,
    pub monitor_name: String,
    pub latency_usec: u64,
    pub driver: String,
    pub flags: DeviceFlags,
    pub props: PropList,
    pub configured_latency_usec: u64,
    pub base_volume: u32,
    pub state: u32,
    pub n_volume_steps: u32,
    pub card: u32,
    pub ports: Vec<DevicePort>,
    /// Empty when the device has no ports.
    pub active_port: String,
    pub formats: Vec<FormatInfo>,
}

/// A capture device. Same layout as [`Sink`]; for a monitor source the
/// monitor fields name the sink being monitored.
pub type Source = Sink;

impl Sink {
    /// Whether this source monitors a sink rather than capturing from hardware.
    /// Only meaningful on sources; every sink has a monitor.
    pub fn is_monitor(&self) -> bool {
        self.monitor_index != crate::protocol::INVALID_INDEX
    }
}

impl Record for Sink {
    fn read(r: &mut TagStructReader) -> Result<Self> {
        let index = r.read_u32()?;
        let name = r.read_string()?;
        let description = r.read_string()?;
        let sample_spec = r.read_sample_spec()?;
        let channel_map = r.read_channel_map()?;
        let owner_module = r.read_u32()?;
        let volume = r.read_cvolume()?;
        let muted = r.read_bool()?;
        let monitor_index = r.read_u32()?;
        let monitor_name = r.read_string()?;
        let latency_usec = r.read_usec()?;
        let driver = r.read_string()?;
        let flags = DeviceFlags(r.read_u32()?);
        let props = r.read_proplist()?;
        let configured_latency_usec = r.read_usec()?;
        let base_volume = r.read_volume()?;
        let state = r.read_u32()?;
        let n_volume_steps = r.read_u32()?;
        let card = r.read_u32()?;

        let port_count = r.read_u32()?;
        let mut ports = Vec::with_capacity(port_count.min(64) as usize);
        for _ in 0..port_count {
            ports.push(DevicePort::read(r)?);
        }
        let active_port = if port_count == 0 {
            r.read_null_string()?;
            String::new()
        } else {
            r.read_string()?
        };

        let format_count = r.read_u8()?;
        let mut formats = Vec::with_capacity(format_count as usize);
        for _ in 0..format_count {
            formats.push(r.read_format_info()?);
        }

        Ok(Self {
            index,
            name,
            description,
            sample_spec,
            channel_map,
            owner_module,
            volume,
            muted,
            monitor_index,
            monitor_name,
            latency_usec,
            driver,
            flags,
            props,
            configured_latency_usec,
            base_volume,
            state,
            n_volume_steps,
            card,
            ports,
            active_port,
            formats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::protocol::INVALID_INDEX;
    use crate::tagstruct::{TagStructWriter, VOLUME_NORM};

    fn prefix(w: &mut TagStructWriter, flags: u32) {
        let mut props = PropList::new();
        props.insert("device.class", "sound");
        w.put_u32(1)
            .put_string("alsa_output.pci-0000_00_1f.3.analog-stereo")
            .put_string("Built-in Audio Analog Stereo")
            .put_sample_spec(SampleSpec { format: 3, channels: 2, rate: 48000 })
            .put_channel_map(&ChannelMap::new(vec![1, 2]))
            .put_u32(7)
            .put_cvolume(&ChannelVolumes::uniform(2, VOLUME_NORM / 2))
            .put_bool(false)
            .put_u32(INVALID_INDEX)
            .put_null_string()
            .put_usec(0)
            .put_string("module-alsa-card.c")
            .put_u32(flags)
            .put_proplist(&props)
            .put_usec(20_000)
            .put_volume(VOLUME_NORM)
            .put_u32(0)
            .put_u32(65537)
            .put_u32(0);
    }

    #[test]
    fn device_without_ports() {
        let mut w = TagStructWriter::new();
        prefix(&mut w, DeviceFlags::HARDWARE);
        w.put_u32(0).put_null_string().put_u8(0);

        let mut r = TagStructReader::new(w.into_bytes().freeze());
        let sink = Sink::read(&mut r).unwrap();
        assert!(r.is_empty());
        assert!(sink.ports.is_empty());
        assert_eq!(sink.active_port, "");
        assert!(sink.formats.is_empty());
        assert!(!sink.is_monitor());
        assert!(sink.flags.is_hardware());
        assert!(!sink.flags.has_dynamic_latency());
        assert_eq!(sink.volume.volumes(), &[VOLUME_NORM / 2, VOLUME_NORM / 2]);
        assert_eq!(sink.props.get("device.class"), Some("sound"));
    }

    #[test]
    fn device_with_ports_and_formats() {
        let mut w = TagStructWriter::new();
        prefix(&mut w, DeviceFlags::HARDWARE | DeviceFlags::DYNAMIC_LATENCY);
        w.put_u32(2)
            .put_string("analog-output-speaker")
            .put_string("Speakers")
            .put_u32(10000)
            .put_u32(1)
            .put_string("analog-output-headphones")
            .put_string("Headphones")
            .put_u32(9900)
            .put_u32(2)
            .put_string("analog-output-speaker")
            .put_u8(1)
            .put_format_info(&FormatInfo { encoding: 1, props: PropList::new() });

        let mut r = TagStructReader::new(w.into_bytes().freeze());
        let sink = Sink::read(&mut r).unwrap();
        assert_eq!(sink.ports.len(), 2);
        assert_eq!(sink.ports[1].description, "Headphones");
        assert_eq!(sink.active_port, "analog-output-speaker");
        assert_eq!(sink.formats[0].encoding, 1);
        assert!(sink.flags.has_dynamic_latency());
    }

    #[test]
    fn portless_device_requires_null_active_port() {
        let mut w = TagStructWriter::new();
        prefix(&mut w, 0);
        w.put_u32(0).put_string("bogus").put_u8(0);

        let mut r = TagStructReader::new(w.into_bytes().freeze());
        assert!(matches!(Sink::read(&mut r), Err(Error::MalformedFrame(_))));
    }
}
