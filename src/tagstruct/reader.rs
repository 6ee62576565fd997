use bytes::{Buf, Bytes};

use super::types::{ChannelMap, ChannelVolumes, FormatInfo, PropList, SampleSpec, Timeval};
use super::{Value, ValueTag};
use crate::error::{Error, Result};

/// Consumes tagged values from a received payload.
#[derive(Debug, Clone)]
pub struct TagStructReader {
    buf: Bytes,
}

impl TagStructReader {
    pub fn new(buf: Bytes) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn is_empty(&self) -> bool {
        !self.buf.has_remaining()
    }

    /// Whatever has not been consumed yet.
    pub fn into_remaining(self) -> Bytes {
        self.buf
    }

    fn need(&self, n: usize, what: &str) -> Result<()> {
        if self.buf.remaining() < n {
            return Err(Error::malformed(format!(
                "frame ended inside {what} (need {n} bytes, have {})",
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    fn next_tag(&mut self) -> Result<u8> {
        self.need(1, "value tag")?;
        Ok(self.buf.get_u8())
    }

    fn expect(&mut self, expected: ValueTag) -> Result<()> {
        let got = self.next_tag()?;
        if got != expected as u8 {
            return Err(mismatch(expected, got));
        }
        Ok(())
    }

    fn raw_u8(&mut self, what: &str) -> Result<u8> {
        self.need(1, what)?;
        Ok(self.buf.get_u8())
    }

    fn raw_u32(&mut self, what: &str) -> Result<u32> {
        self.need(4, what)?;
        Ok(self.buf.get_u32())
    }

    fn raw_u64(&mut self, what: &str) -> Result<u64> {
        self.need(8, what)?;
        Ok(self.buf.get_u64())
    }

    fn raw_cstring(&mut self) -> Result<String> {
        let Some(end) = self.buf.iter().position(|&b| b == 0) else {
            return Err(Error::malformed("unterminated string"));
        };
        let body = self.buf.split_to(end);
        self.buf.advance(1);
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.expect(ValueTag::U32)?;
        self.raw_u32("u32")
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.expect(ValueTag::U8)?;
        self.raw_u8("u8")
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.expect(ValueTag::U64)?;
        self.raw_u64("u64")
    }

    pub fn read_s64(&mut self) -> Result<i64> {
        self.expect(ValueTag::S64)?;
        Ok(self.raw_u64("i64")? as i64)
    }

    pub fn read_usec(&mut self) -> Result<u64> {
        self.expect(ValueTag::Usec)?;
        self.raw_u64("usec")
    }

    pub fn read_volume(&mut self) -> Result<u32> {
        self.expect(ValueTag::Volume)?;
        self.raw_u32("volume")
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.next_tag()? {
            b'1' => Ok(true),
            b'0' => Ok(false),
            other => Err(Error::malformed(format!(
                "expected boolean but got {}",
                describe(other)
            ))),
        }
    }

    /// Reads a string; a null string yields the empty string.
    pub fn read_string(&mut self) -> Result<String> {
        Ok(self.read_optional_string()?.unwrap_or_default())
    }

    /// Reads a string, keeping a null string distinct as `None`.
    pub fn read_optional_string(&mut self) -> Result<Option<String>> {
        match self.next_tag()? {
            b't' => self.raw_cstring().map(Some),
            b'N' => Ok(None),
            other => Err(mismatch(ValueTag::String, other)),
        }
    }

    pub fn read_null_string(&mut self) -> Result<()> {
        self.expect(ValueTag::NullString)
    }

    pub fn read_arbitrary(&mut self) -> Result<Vec<u8>> {
        self.expect(ValueTag::Arbitrary)?;
        let len = self.raw_u32("arbitrary length")? as usize;
        self.need(len, "arbitrary data")?;
        Ok(self.buf.split_to(len).to_vec())
    }

    pub fn read_timeval(&mut self) -> Result<Timeval> {
        self.expect(ValueTag::Timeval)?;
        Ok(Timeval {
            secs: self.raw_u32("timeval")?,
            usecs: self.raw_u32("timeval")?,
        })
    }

    pub fn read_sample_spec(&mut self) -> Result<SampleSpec> {
        self.expect(ValueTag::SampleSpec)?;
        Ok(SampleSpec {
            format: self.raw_u8("sample spec")?,
            channels: self.raw_u8("sample spec")?,
            rate: self.raw_u32("sample spec")?,
        })
    }

    pub fn read_channel_map(&mut self) -> Result<ChannelMap> {
        self.expect(ValueTag::ChannelMap)?;
        let count = self.raw_u8("channel map")? as usize;
        self.need(count, "channel map")?;
        Ok(ChannelMap::new(self.buf.split_to(count).to_vec()))
    }

    pub fn read_cvolume(&mut self) -> Result<ChannelVolumes> {
        self.expect(ValueTag::CVolume)?;
        let count = self.raw_u8("cvolume")? as usize;
        self.need(count * 4, "cvolume")?;
        let volumes = (0..count).map(|_| self.buf.get_u32()).collect();
        Ok(ChannelVolumes::new(volumes))
    }

    pub fn read_proplist(&mut self) -> Result<PropList> {
        self.expect(ValueTag::PropList)?;
        let mut props = PropList::new();
        loop {
            match self.next_tag()? {
                b'N' => break,
                b't' => {}
                other => {
                    return Err(Error::malformed(format!(
                        "expected property key or end of list but got {}",
                        describe(other)
                    )));
                }
            }
            let key = self.raw_cstring()?;
            let declared = self.read_u32()?;
            self.expect(ValueTag::Arbitrary)?;
            let len = self.raw_u32("property length")?;
            if declared != len || len == 0 {
                return Err(Error::malformed(format!(
                    "property {key:?} length mismatch (declared {declared}, data {len})"
                )));
            }
            self.need(len as usize, "property value")?;
            let data = self.buf.split_to(len as usize);
            let value = &data[..data.len() - 1];
            if data[data.len() - 1] != 0 || value.contains(&0) {
                return Err(Error::malformed(format!(
                    "property {key:?} value is not a {}-byte string",
                    len - 1
                )));
            }
            props.insert(key, String::from_utf8_lossy(value).into_owned());
        }
        Ok(props)
    }

    pub fn read_format_info(&mut self) -> Result<FormatInfo> {
        self.expect(ValueTag::FormatInfo)?;
        Ok(FormatInfo {
            encoding: self.read_u8()?,
            props: self.read_proplist()?,
        })
    }

    /// Reads whatever value comes next, driven by its marker.
    pub fn read_value(&mut self) -> Result<Value> {
        self.need(1, "value tag")?;
        let byte = self.buf.chunk()[0];
        let Some(tag) = ValueTag::from_u8(byte) else {
            return Err(Error::malformed(format!("unknown value tag {}", describe(byte))));
        };
        let value = match tag {
            ValueTag::String | ValueTag::NullString => Value::String(self.read_string()?),
            ValueTag::U32 => Value::U32(self.read_u32()?),
            ValueTag::U8 => Value::U8(self.read_u8()?),
            ValueTag::U64 => Value::U64(self.read_u64()?),
            ValueTag::S64 => Value::S64(self.read_s64()?),
            ValueTag::SampleSpec => Value::SampleSpec(self.read_sample_spec()?),
            ValueTag::Arbitrary => Value::Arbitrary(self.read_arbitrary()?),
            ValueTag::True | ValueTag::False => Value::Bool(self.read_bool()?),
            ValueTag::Timeval => Value::Timeval(self.read_timeval()?),
            ValueTag::Usec => Value::Usec(self.read_usec()?),
            ValueTag::ChannelMap => Value::ChannelMap(self.read_channel_map()?),
            ValueTag::CVolume => Value::CVolume(self.read_cvolume()?),
            ValueTag::PropList => Value::PropList(self.read_proplist()?),
            ValueTag::Volume => Value::Volume(self.read_volume()?),
            ValueTag::FormatInfo => Value::FormatInfo(self.read_format_info()?),
        };
        Ok(value)
    }
}

fn describe(byte: u8) -> String {
    match ValueTag::from_u8(byte) {
        Some(tag) => format!("{tag:?}"),
        None => format!("0x{byte:02x}"),
    }
}

fn mismatch(expected: ValueTag, got: u8) -> Error {
    Error::malformed(format!("expected {expected:?} but got {}", describe(got)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(bytes: &'static [u8]) -> TagStructReader {
        TagStructReader::new(Bytes::from_static(bytes))
    }

    #[test]
    fn integer_tag_mismatch_is_fatal() {
        let mut r = reader(b"B\x05");
        let err = r.read_u32().unwrap_err();
        assert!(matches!(err, Error::MalformedFrame(ref m) if m.contains("expected U32")));
    }

    #[test]
    fn truncated_integer_is_malformed() {
        let mut r = reader(b"L\x00\x01");
        assert!(matches!(r.read_u32(), Err(Error::MalformedFrame(_))));
    }

    #[test]
    fn null_string_reads_as_empty() {
        let mut r = reader(b"Ntthis\0");
        assert_eq!(r.read_string().unwrap(), "");
        assert_eq!(r.read_string().unwrap(), "this");
        assert!(r.is_empty());
    }

    #[test]
    fn booleans_only_accept_one_and_zero() {
        let mut r = reader(b"10B");
        assert!(r.read_bool().unwrap());
        assert!(!r.read_bool().unwrap());
        assert!(r.read_bool().is_err());
    }

    #[test]
    fn proplist_rejects_foreign_tags() {
        let mut r = reader(b"PL\x00\x00\x00\x01N");
        assert!(matches!(r.read_proplist(), Err(Error::MalformedFrame(_))));
    }

    #[test]
    fn proplist_rejects_length_disagreement() {
        let mut r = reader(b"Pta\0L\x00\x00\x00\x04x\x00\x00\x00\x03xy\0N");
        assert!(matches!(r.read_proplist(), Err(Error::MalformedFrame(_))));
    }

    #[test]
    fn proplist_tolerates_present_empty_values() {
        let mut r = reader(b"Pta\0L\x00\x00\x00\x01x\x00\x00\x00\x01\0N");
        let props = r.read_proplist().unwrap();
        assert_eq!(props.get("a"), Some(""));
    }

    #[test]
    fn single_entry_proplist() {
        let mut r = reader(b"Pta\0L\x00\x00\x00\x03x\x00\x00\x00\x03xy\0N");
        let props = r.read_proplist().unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props.get("a"), Some("xy"));
    }

    #[test]
    fn unterminated_string_is_malformed() {
        let mut r = reader(b"tabc");
        assert!(matches!(r.read_string(), Err(Error::MalformedFrame(_))));
    }
}
