//! Bidirectional enum registries
//!
//! Remote APIs encode enumerations as integers while configurations use
//! names. An [`EnumRegistry`] is the single table for both directions, so
//! the two can never drift apart. Lookups return errors instead of
//! panicking, and [`EnumRegistry::validate`] is meant to be asserted from a
//! unit test for every registry a provider declares.

use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{value} is not a known {registry}; expected one of: {expected}")]
pub struct NotFoundError {
    pub registry: &'static str,
    pub value: String,
    pub expected: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{registry} declares no values")]
    Empty { registry: &'static str },

    #[error("{registry}: wire value {wire} is declared more than once")]
    DuplicateWire { registry: &'static str, wire: i64 },

    #[error("{registry}: name {display:?} is declared more than once")]
    DuplicateDisplay {
        registry: &'static str,
        display: &'static str,
    },
}

/// Fixed mapping between wire integers and display names
#[derive(Debug)]
pub struct EnumRegistry {
    name: &'static str,
    entries: &'static [(i64, &'static str)],
}

impl EnumRegistry {
    pub const fn new(name: &'static str, entries: &'static [(i64, &'static str)]) -> Self {
        Self { name, entries }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub fn to_display(&self, wire: i64) -> Result<&'static str, NotFoundError> {
        self.entries
            .iter()
            .find(|(w, _)| *w == wire)
            .map(|(_, d)| *d)
            .ok_or_else(|| self.not_found(wire.to_string()))
    }

    pub fn to_wire(&self, display: &str) -> Result<i64, NotFoundError> {
        self.entries
            .iter()
            .find(|(_, d)| *d == display)
            .map(|(w, _)| *w)
            .ok_or_else(|| self.not_found(format!("{display:?}")))
    }

    pub fn contains(&self, display: &str) -> bool {
        self.entries.iter().any(|(_, d)| *d == display)
    }

    /// Display names in declaration order
    pub fn displays(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(_, d)| *d)
    }

    /// Check that the table is non-empty and both columns are unique
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.entries.is_empty() {
            return Err(RegistryError::Empty {
                registry: self.name,
            });
        }
        let mut wires = HashSet::new();
        let mut displays = HashSet::new();
        for &(wire, display) in self.entries {
            if !wires.insert(wire) {
                return Err(RegistryError::DuplicateWire {
                    registry: self.name,
                    wire,
                });
            }
            if !displays.insert(display) {
                return Err(RegistryError::DuplicateDisplay {
                    registry: self.name,
                    display,
                });
            }
        }
        Ok(())
    }

    fn not_found(&self, value: String) -> NotFoundError {
        NotFoundError {
            registry: self.name,
            value,
            expected: self.displays().collect::<Vec<_>>().join(", "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static COLORS: EnumRegistry = EnumRegistry::new("color", &[(0, "Red"), (1, "Green"), (4, "Blue")]);

    #[test]
    fn test_lookups() {
        COLORS.validate().unwrap();
        assert_eq!(COLORS.to_display(4), Ok("Blue"));
        assert_eq!(COLORS.to_wire("Green"), Ok(1));
        assert!(COLORS.contains("Red"));
        assert_eq!(COLORS.displays().collect::<Vec<_>>(), ["Red", "Green", "Blue"]);
    }

    #[test]
    fn test_not_found() {
        let err = COLORS.to_display(2).unwrap_err();
        assert_eq!(err.to_string(), "2 is not a known color; expected one of: Red, Green, Blue");
        let err = COLORS.to_wire("green").unwrap_err();
        assert_eq!(err.value, "\"green\"");
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        static DUP_WIRE: EnumRegistry = EnumRegistry::new("dup", &[(0, "A"), (0, "B")]);
        static DUP_NAME: EnumRegistry = EnumRegistry::new("dup", &[(0, "A"), (1, "A")]);
        static EMPTY: EnumRegistry = EnumRegistry::new("empty", &[]);

        assert_eq!(
            DUP_WIRE.validate(),
            Err(RegistryError::DuplicateWire { registry: "dup", wire: 0 })
        );
        assert!(matches!(
            DUP_NAME.validate(),
            Err(RegistryError::DuplicateDisplay { display: "A", .. })
        ));
        assert!(matches!(EMPTY.validate(), Err(RegistryError::Empty { .. })));
    }
}
