//! Desired-state configuration
//!
//! One TOML file declares every managed resource, keyed by resource type and
//! then by a local address name:
//!
//! ```toml
//! [dns_zone.main]
//! domain = "example.com"
//!
//! [dns_record.www]
//! zone = "example.com"
//! type = "CNAME"
//! name = "www"
//! value = "cdn.example.net"
//! ```
//!
//! Attribute values may be written as `"(known after apply)"` when they are
//! produced by another system and not yet available.

use anyhow::{Context, Result};
use declarative::{BoxedResource, Value};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;
use crate::resource::{DnsRecord, DnsZone, Pullzone, PullzoneHostname};

/// Default configuration file name inside the config directory
pub const CONFIG_FILE: &str = "bunnyform.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesiredConfig {
    #[serde(default)]
    pub dns_zone: BTreeMap<String, DnsZoneConfig>,
    #[serde(default)]
    pub dns_record: BTreeMap<String, DnsRecordConfig>,
    #[serde(default)]
    pub pullzone: BTreeMap<String, PullzoneConfig>,
    #[serde(default)]
    pub pullzone_hostname: BTreeMap<String, PullzoneHostnameConfig>,
}

// ============================================================================
// Resource Configurations
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DnsZoneConfig {
    pub domain: String,
    #[serde(default)]
    pub nameserver_custom: Value<bool>,
    #[serde(default)]
    pub nameserver1: Value<String>,
    #[serde(default)]
    pub nameserver2: Value<String>,
    #[serde(default)]
    pub soa_email: Value<String>,
    #[serde(default)]
    pub log_enabled: Value<bool>,
    #[serde(default)]
    pub log_anonymized: Value<bool>,
    #[serde(default)]
    pub log_anonymized_style: Value<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DnsRecordConfig {
    /// Domain of the zone the record lives in
    pub zone: String,
    #[serde(rename = "type", default)]
    pub record_type: Value<String>,
    #[serde(default)]
    pub name: Value<String>,
    #[serde(default)]
    pub value: Value<String>,
    #[serde(default)]
    pub ttl: Value<u32>,
    #[serde(default)]
    pub priority: Value<u16>,
    #[serde(default)]
    pub weight: Value<u16>,
    #[serde(default)]
    pub port: Value<u16>,
    /// Pull zone a `PullZone` record points at
    #[serde(default)]
    pub link_name: Value<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PullzoneConfig {
    pub name: String,
    #[serde(default)]
    pub origin_url: Value<String>,
    #[serde(default)]
    pub cache_vary: Value<BTreeSet<String>>,
    #[serde(default)]
    pub optimizer_image_format: Value<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PullzoneHostnameConfig {
    /// Name of the pull zone serving this hostname
    pub pullzone: String,
    #[serde(default)]
    pub name: Value<String>,
    #[serde(default)]
    pub tls_enabled: Value<bool>,
    #[serde(default)]
    pub force_ssl: Value<bool>,
}

// ============================================================================
// Loading
// ============================================================================

impl DesiredConfig {
    /// Resolve the configuration path: explicit flag, else the config dir
    pub fn path(explicit: Option<&str>) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(paths::expand(path)),
            None => Ok(paths::config_dir()?.join(CONFIG_FILE)),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        log::debug!(
            "Loaded {} resources from {}",
            config.len(),
            path.display()
        );
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Number of declared resources
    pub fn len(&self) -> usize {
        self.dns_zone.len() + self.dns_record.len() + self.pullzone.len() + self.pullzone_hostname.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every declared resource, parents first
    pub fn resources(&self) -> Vec<BoxedResource> {
        let mut resources: Vec<BoxedResource> = Vec::with_capacity(self.len());
        for (address, config) in &self.dns_zone {
            resources.push(Box::new(DnsZone::new(address, config.clone())));
        }
        for (address, config) in &self.dns_record {
            resources.push(Box::new(DnsRecord::new(address, config.clone())));
        }
        for (address, config) in &self.pullzone {
            resources.push(Box::new(Pullzone::new(address, config.clone())));
        }
        for (address, config) in &self.pullzone_hostname {
            resources.push(Box::new(PullzoneHostname::new(address, config.clone())));
        }
        resources
    }
}
