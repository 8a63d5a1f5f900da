//! Wire enums of the bunny.net API
//!
//! Configuration uses the display names; the API stores integers.

use anyhow::{Context, Result};
use declarative::{EnumRegistry, Record};

pub static DNS_RECORD_TYPE: EnumRegistry = EnumRegistry::new(
    "DNS record type",
    &[
        (0, "A"),
        (1, "AAAA"),
        (2, "CNAME"),
        (3, "TXT"),
        (4, "MX"),
        (5, "Redirect"),
        (6, "Flatten"),
        (7, "PullZone"),
        (8, "SRV"),
        (9, "CAA"),
        (10, "PTR"),
        (11, "Script"),
        (12, "NS"),
    ],
);

pub static LOG_ANONYMIZED_STYLE: EnumRegistry =
    EnumRegistry::new("log anonymization style", &[(0, "OneDigit"), (1, "Drop")]);

pub static IMAGE_FORMAT: EnumRegistry = EnumRegistry::new(
    "optimizer image format",
    &[(0, "Original"), (1, "WebP"), (2, "Avif")],
);

/// Replace the display name stored under `attribute` with its wire integer
pub fn encode_field(record: &mut Record, attribute: &str, registry: &EnumRegistry) -> Result<()> {
    if let Some(value) = record.get_mut(attribute) {
        *value = registry.to_wire(value)?.to_string();
    }
    Ok(())
}

/// Replace the wire integer stored under `attribute` with its display name
pub fn decode_field(record: &mut Record, attribute: &str, registry: &EnumRegistry) -> Result<()> {
    if let Some(value) = record.get_mut(attribute) {
        let wire: i64 = value
            .parse()
            .with_context(|| format!("{attribute} holds a non-numeric {}: {value}", registry.name()))?;
        *value = registry.to_display(wire)?.to_string();
    }
    Ok(())
}
