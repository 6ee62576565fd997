//! Decoded server objects.
//!
//! Every record reads its fields strictly in wire order. List replies carry
//! records back to back until the payload is exhausted.

mod card;
mod module;
mod server;
mod sink;

pub use card::{Card, CardPort, CardProfile};
pub use module::Module;
pub use server::{Server, ServerFlavor, ServerVersion};
pub use sink::{DeviceFlags, DevicePort, Sink, Source};

use bytes::Bytes;

use crate::error::Result;
use crate::tagstruct::TagStructReader;

/// A record with a fixed positional schema.
pub trait Record: Sized {
    fn read(r: &mut TagStructReader) -> Result<Self>;
}

/// Decodes a list reply: records until the body runs out.
pub fn read_list<T: Record>(body: Bytes) -> Result<Vec<T>> {
    let mut r = TagStructReader::new(body);
    let mut items = Vec::new();
    while !r.is_empty() {
        items.push(T::read(&mut r)?);
    }
    Ok(items)
}

/// Decodes a single-record reply; anything after the record is ignored.
pub fn read_one<T: Record>(body: Bytes) -> Result<T> {
    let mut r = TagStructReader::new(body);
    let item = T::read(&mut r)?;
    if !r.is_empty() {
        log::debug!("ignoring {} trailing bytes after record", r.remaining());
    }
    Ok(item)
}
