//! Operator overrides consulted during resolution.

use crate::tables::{self, DescriptorTable};
use diagmerge_types::{Attributes, ConfigEntry, StashFlavor};
use std::collections::BTreeMap;

/// Everything the operator can pin down instead of leaving to the resolvers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub flavor: StashFlavor,
    pub descriptors: DescriptorTable,
    /// Frequency class to quoted usage label.
    pub default_usage: BTreeMap<String, String>,
    /// Atmosphere code (`m01s02i207`) to quoted domain label.
    pub domain_overrides: BTreeMap<String, String>,
    /// Domain profiles offered when neither site nor reference defines a label.
    pub user_domains: Vec<ConfigEntry>,
    /// Unquoted usage label to stream id.
    pub usage_streams: BTreeMap<String, String>,
    /// Stream id to the attributes of a stream the operator approved for creation.
    pub approved_streams: BTreeMap<String, Attributes>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            flavor: StashFlavor::default(),
            descriptors: DescriptorTable::default(),
            default_usage: tables::default_usage(),
            domain_overrides: BTreeMap::new(),
            user_domains: Vec::new(),
            usage_streams: BTreeMap::new(),
            approved_streams: BTreeMap::new(),
        }
    }
}

impl Policy {
    pub fn with_flavor(mut self, flavor: StashFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    pub fn with_domain_override(mut self, code: &str, label: &str) -> Self {
        self.domain_overrides
            .insert(code.trim().to_string(), tables::quoted(label));
        self
    }

    pub fn with_default_usage(mut self, frequency: &str, usage: &str) -> Self {
        self.default_usage
            .insert(frequency.to_string(), tables::quoted(usage));
        self
    }

    pub fn with_usage_stream(mut self, usage: &str, stream: &str) -> Self {
        self.usage_streams.insert(
            tables::unquoted(usage).to_string(),
            tables::unquoted(stream).to_string(),
        );
        self
    }

    pub fn with_approved_stream(mut self, stream: &str, attributes: Attributes) -> Self {
        self.approved_streams
            .insert(tables::unquoted(stream).to_string(), attributes);
        self
    }

    pub fn with_user_domain(mut self, entry: ConfigEntry) -> Self {
        self.user_domains.push(entry);
        self
    }

    /// Section holding streams in the chosen flavor's store.
    pub fn stream_section(&self, stream: &str) -> String {
        match self.flavor {
            StashFlavor::Um => format!("namelist:nlstcall_pp({})", stream),
            StashFlavor::Xios => format!("namelist:xios_streams({})", stream),
        }
    }

    pub fn usage_stream(&self, usage: &str) -> Option<&str> {
        self.usage_streams
            .get(tables::unquoted(usage))
            .map(String::as_str)
    }
}
