use serde::Serialize;

use super::Record;
use crate::error::Result;
use crate::tagstruct::{PropList, TagStructReader};

/// A loaded server module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Module {
    pub index: u32,
    pub name: String,
    pub argument: String,
    pub n_used: u32,
    pub props: PropList,
}

impl Module {
    /// Whether this is `name` loaded with an argument containing `fragment`.
    pub fn matches(&self, name: &str, fragment: &str) -> bool {
        self.name == name && self.argument.contains(fragment)
    }
}

impl Record for Module {
    fn read(r: &mut TagStructReader) -> Result<Self> {
        Ok(Self {
            index: r.read_u32()?,
            name: r.read_string()?,
            argument: r.read_string()?,
            n_used: r.read_u32()?,
            props: r.read_proplist()?,
        })
    }
}
