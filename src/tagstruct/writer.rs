use bytes::{BufMut, BytesMut};

use super::types::{ChannelMap, ChannelVolumes, FormatInfo, PropList, SampleSpec, Timeval};
use super::{Value, ValueTag, CHANNELS_MAX};

/// Appends tagged values to a growable buffer.
#[derive(Debug, Default)]
pub struct TagStructWriter {
    buf: BytesMut,
}

impl TagStructWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> BytesMut {
        self.buf
    }

    fn tag(&mut self, tag: ValueTag) -> &mut Self {
        self.buf.put_u8(tag as u8);
        self
    }

    pub fn put_u32(&mut self, value: u32) -> &mut Self {
        self.tag(ValueTag::U32);
        self.buf.put_u32(value);
        self
    }

    pub fn put_u8(&mut self, value: u8) -> &mut Self {
        self.tag(ValueTag::U8);
        self.buf.put_u8(value);
        self
    }

    pub fn put_u64(&mut self, value: u64) -> &mut Self {
        self.tag(ValueTag::U64);
        self.buf.put_u64(value);
        self
    }

    pub fn put_s64(&mut self, value: i64) -> &mut Self {
        self.tag(ValueTag::S64);
        self.buf.put_i64(value);
        self
    }

    pub fn put_usec(&mut self, value: u64) -> &mut Self {
        self.tag(ValueTag::Usec);
        self.buf.put_u64(value);
        self
    }

    pub fn put_volume(&mut self, value: u32) -> &mut Self {
        self.tag(ValueTag::Volume);
        self.buf.put_u32(value);
        self
    }

    pub fn put_bool(&mut self, value: bool) -> &mut Self {
        self.tag(if value { ValueTag::True } else { ValueTag::False })
    }

    /// Writes a NUL-terminated string; the empty string goes out as a null
    /// string. An interior NUL ends the string on the server side.
    pub fn put_string(&mut self, value: &str) -> &mut Self {
        if value.is_empty() {
            return self.put_null_string();
        }
        self.tag(ValueTag::String);
        self.put_cstring(value);
        self
    }

    pub fn put_null_string(&mut self) -> &mut Self {
        self.tag(ValueTag::NullString)
    }

    fn put_cstring(&mut self, value: &str) {
        self.buf.put_slice(value.as_bytes());
        self.buf.put_u8(0);
    }

    pub fn put_arbitrary(&mut self, data: &[u8]) -> &mut Self {
        self.tag(ValueTag::Arbitrary);
        self.buf.put_u32(data.len() as u32);
        self.buf.put_slice(data);
        self
    }

    pub fn put_timeval(&mut self, tv: Timeval) -> &mut Self {
        self.tag(ValueTag::Timeval);
        self.buf.put_u32(tv.secs);
        self.buf.put_u32(tv.usecs);
        self
    }

    pub fn put_sample_spec(&mut self, spec: SampleSpec) -> &mut Self {
        self.tag(ValueTag::SampleSpec);
        self.buf.put_u8(spec.format);
        self.buf.put_u8(spec.channels);
        self.buf.put_u32(spec.rate);
        self
    }

    pub fn put_channel_map(&mut self, map: &ChannelMap) -> &mut Self {
        let positions = &map.positions()[..map.len().min(CHANNELS_MAX)];
        self.tag(ValueTag::ChannelMap);
        self.buf.put_u8(positions.len() as u8);
        self.buf.put_slice(positions);
        self
    }

    pub fn put_cvolume(&mut self, volumes: &ChannelVolumes) -> &mut Self {
        let values = &volumes.volumes()[..volumes.len().min(CHANNELS_MAX)];
        self.tag(ValueTag::CVolume);
        self.buf.put_u8(values.len() as u8);
        for v in values {
            self.buf.put_u32(*v);
        }
        self
    }

    /// Writes a property list. Entries with an empty value are skipped.
    pub fn put_proplist(&mut self, props: &PropList) -> &mut Self {
        self.tag(ValueTag::PropList);
        for (key, value) in props.iter() {
            if value.is_empty() {
                continue;
            }
            // +1 for the terminating NUL
            let len = value.len() as u32 + 1;
            self.tag(ValueTag::String);
            self.put_cstring(key);
            self.put_u32(len);
            self.tag(ValueTag::Arbitrary);
            self.buf.put_u32(len);
            self.put_cstring(value);
        }
        self.put_null_string()
    }

    pub fn put_format_info(&mut self, info: &FormatInfo) -> &mut Self {
        self.tag(ValueTag::FormatInfo);
        self.put_u8(info.encoding);
        self.put_proplist(&info.props)
    }

    pub fn put_value(&mut self, value: &Value) -> &mut Self {
        match value {
            Value::U32(v) => self.put_u32(*v),
            Value::U8(v) => self.put_u8(*v),
            Value::U64(v) => self.put_u64(*v),
            Value::S64(v) => self.put_s64(*v),
            Value::String(s) => self.put_string(s),
            Value::Arbitrary(data) => self.put_arbitrary(data),
            Value::Bool(b) => self.put_bool(*b),
            Value::Timeval(tv) => self.put_timeval(*tv),
            Value::Usec(v) => self.put_usec(*v),
            Value::SampleSpec(spec) => self.put_sample_spec(*spec),
            Value::ChannelMap(map) => self.put_channel_map(map),
            Value::CVolume(volumes) => self.put_cvolume(volumes),
            Value::PropList(props) => self.put_proplist(props),
            Value::Volume(v) => self.put_volume(*v),
            Value::FormatInfo(info) => self.put_format_info(info),
        }
    }
}
