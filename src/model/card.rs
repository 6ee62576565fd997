use serde::Serialize;

use super::Record;
use crate::error::Result;
use crate::tagstruct::{PropList, TagStructReader};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardProfile {
    pub name: String,
    pub description: String,
    pub n_sinks: u32,
    pub n_sources: u32,
    pub priority: u32,
    pub available: u32,
}

/// A card port. `profiles` are indices into [`Card::profiles`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardPort {
    pub name: String,
    pub description: String,
    pub priority: u32,
    pub available: u32,
    pub direction: u8,
    pub props: PropList,
    pub profiles: Vec<usize>,
    pub latency_offset: i64,
}

/// A sound card. The card owns its profiles; the active profile and the
/// ports refer to them by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub index: u32,
    pub name: String,
    pub owner_module: u32,
    pub driver: String,
    pub profiles: Vec<CardProfile>,
    pub active_profile: Option<usize>,
    pub props: PropList,
    pub ports: Vec<CardPort>,
}

impl Card {
    pub fn profile(&self, name: &str) -> Option<&CardProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn active_profile(&self) -> Option<&CardProfile> {
        self.active_profile.and_then(|i| self.profiles.get(i))
    }

    /// Profiles a port is part of.
    pub fn port_profiles<'a>(&'a self, port: &'a CardPort) -> impl Iterator<Item = &'a CardProfile> {
        port.profiles.iter().filter_map(|&i| self.profiles.get(i))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.profiles.iter().position(|p| p.name == name)
    }
}

impl Record for Card {
    fn read(r: &mut TagStructReader) -> Result<Self> {
        let mut card = Card {
            index: r.read_u32()?,
            name: r.read_string()?,
            owner_module: r.read_u32()?,
            driver: r.read_string()?,
            profiles: Vec::new(),
            active_profile: None,
            props: PropList::new(),
            ports: Vec::new(),
        };

        let profile_count = r.read_u32()?;
        for _ in 0..profile_count {
            card.profiles.push(CardProfile {
                name: r.read_string()?,
                description: r.read_string()?,
                n_sinks: r.read_u32()?,
                n_sources: r.read_u32()?,
                priority: r.read_u32()?,
                available: r.read_u32()?,
            });
        }

        let active = r.read_optional_string()?;
        card.active_profile = active.as_deref().and_then(|name| card.position(name));
        card.props = r.read_proplist()?;

        let port_count = r.read_u32()?;
        for _ in 0..port_count {
            let name = r.read_string()?;
            let description = r.read_string()?;
            let priority = r.read_u32()?;
            let available = r.read_u32()?;
            let direction = r.read_u8()?;
            let props = r.read_proplist()?;

            let n = r.read_u32()?;
            let mut profiles = Vec::new();
            for _ in 0..n {
                let profile = r.read_string()?;
                match card.position(&profile) {
                    Some(i) => profiles.push(i),
                    None => log::debug!(
                        "card {}: port {} lists unknown profile {:?}",
                        card.name,
                        name,
                        profile
                    ),
                }
            }

            card.ports.push(CardPort {
                name,
                description,
                priority,
                available,
                direction,
                props,
                profiles,
                latency_offset: r.read_s64()?,
            });
        }
        Ok(card)
    }
}
