//! Tagged-value codec of the native protocol.
//!
//! Every value on the wire is preceded by a one-byte type marker, which makes
//! payloads self-describing:
//!
//! ```text
//! 'L' u32        'B' u8         'R' u64        'r' i64
//! 't' string\0   'N' null str   'x' len+bytes  '1' / '0' bool
//! 'T' sec,usec   'U' usec u64   'a' sample spec
//! 'm' chan map   'v' cvolume    'P' proplist   'V' volume  'f' format info
//! ```
//!
//! Readers are pattern-driven: the caller asks for the type it expects and a
//! mismatching marker is a `MalformedFrame` error.

mod reader;
mod types;
mod writer;

pub use reader::TagStructReader;
pub use types::{
    ChannelMap, ChannelVolumes, FormatInfo, PropList, SampleSpec, Timeval, CHANNELS_MAX,
    VOLUME_MUTED, VOLUME_NORM,
};
pub use writer::TagStructWriter;

/// Type markers preceding each value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ValueTag {
    String = b't',
    NullString = b'N',
    U32 = b'L',
    U8 = b'B',
    U64 = b'R',
    S64 = b'r',
    SampleSpec = b'a',
    Arbitrary = b'x',
    True = b'1',
    False = b'0',
    Timeval = b'T',
    Usec = b'U',
    ChannelMap = b'm',
    CVolume = b'v',
    PropList = b'P',
    Volume = b'V',
    FormatInfo = b'f',
}

impl ValueTag {
    pub fn from_u8(byte: u8) -> Option<Self> {
        let tag = match byte {
            b't' => ValueTag::String,
            b'N' => ValueTag::NullString,
            b'L' => ValueTag::U32,
            b'B' => ValueTag::U8,
            b'R' => ValueTag::U64,
            b'r' => ValueTag::S64,
            b'a' => ValueTag::SampleSpec,
            b'x' => ValueTag::Arbitrary,
            b'1' => ValueTag::True,
            b'0' => ValueTag::False,
            b'T' => ValueTag::Timeval,
            b'U' => ValueTag::Usec,
            b'm' => ValueTag::ChannelMap,
            b'v' => ValueTag::CVolume,
            b'P' => ValueTag::PropList,
            b'V' => ValueTag::Volume,
            b'f' => ValueTag::FormatInfo,
            _ => return None,
        };
        Some(tag)
    }
}

/// A single decoded value of any supported kind.
///
/// An empty string is written as a null string, and a null string reads back
/// as an empty string.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U32(u32),
    U8(u8),
    U64(u64),
    S64(i64),
    String(String),
    Arbitrary(Vec<u8>),
    Bool(bool),
    Timeval(Timeval),
    Usec(u64),
    SampleSpec(SampleSpec),
    ChannelMap(ChannelMap),
    CVolume(ChannelVolumes),
    PropList(PropList),
    Volume(u32),
    FormatInfo(FormatInfo),
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn round_trip(value: Value) -> Value {
        let mut w = TagStructWriter::new();
        w.put_value(&value);
        let mut r = TagStructReader::new(Bytes::from(w.into_bytes()));
        let decoded = r.read_value().expect("decode");
        assert!(r.is_empty(), "trailing bytes after {value:?}");
        decoded
    }

    #[test]
    fn every_kind_survives_a_round_trip() {
        let mut props = PropList::new();
        props.insert("device.description", "Filtered Microphone");

        let values = vec![
            Value::U32(0xDEAD_BEEF),
            Value::U8(7),
            Value::U64(u64::MAX - 1),
            Value::S64(-42),
            Value::String("nui_mic_remap".into()),
            Value::String(String::new()),
            Value::Arbitrary(vec![1, 2, 3, 0]),
            Value::Arbitrary(Vec::new()),
            Value::Bool(true),
            Value::Bool(false),
            Value::Timeval(Timeval { secs: 1_700_000_000, usecs: 999_999 }),
            Value::Usec(20_000),
            Value::SampleSpec(SampleSpec { format: 3, channels: 2, rate: 48_000 }),
            Value::ChannelMap(ChannelMap::new(vec![1, 2])),
            Value::CVolume(ChannelVolumes::new(vec![VOLUME_NORM, VOLUME_NORM / 2])),
            Value::PropList(props.clone()),
            Value::Volume(VOLUME_NORM),
            Value::FormatInfo(FormatInfo { encoding: 1, props }),
        ];

        for value in values {
            assert_eq!(round_trip(value.clone()), value);
        }
    }

    #[test]
    fn unknown_marker_is_malformed() {
        let mut r = TagStructReader::new(Bytes::from_static(b"Z"));
        assert!(matches!(
            r.read_value(),
            Err(crate::Error::MalformedFrame(_))
        ));
    }
}
