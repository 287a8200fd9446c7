//! Dialect registry: maps inventory dialect ids to drivers.

use indexmap::IndexMap;

use super::{arista, cisco, mypower, oring, rubytech, zyxel};
use super::{DialectDriver, DialectId};

/// Registry of the fleet's dialect drivers.
///
/// Lookup happens before any network attempt: a device whose `dialect_id`
/// resolves to no registered driver is rejected up front.
pub struct DialectRegistry {
    drivers: IndexMap<DialectId, Box<dyn DialectDriver>>,
}

impl DialectRegistry {
    /// Create a registry with all built-in dialects.
    pub fn with_builtins() -> Self {
        let mut drivers: IndexMap<DialectId, Box<dyn DialectDriver>> = IndexMap::new();
        for driver in [
            Box::new(cisco::CiscoDriver) as Box<dyn DialectDriver>,
            Box::new(zyxel::ZyxelDriver),
            Box::new(mypower::MyPowerDriver),
            Box::new(oring::OringDriver),
            Box::new(rubytech::RubytechDriver),
            Box::new(arista::AristaDriver),
        ] {
            drivers.insert(driver.id(), driver);
        }
        Self { drivers }
    }

    /// Get the driver for a dialect.
    pub fn get(&self, id: DialectId) -> Option<&dyn DialectDriver> {
        self.drivers.get(&id).map(|d| d.as_ref())
    }

    /// Resolve an inventory `dialect_id` string to its driver.
    pub fn resolve(&self, raw: &str) -> Option<&dyn DialectDriver> {
        DialectId::parse(raw).and_then(|id| self.get(id))
    }

    /// Registered dialect ids, in registration order.
    pub fn ids(&self) -> impl Iterator<Item = DialectId> + '_ {
        self.drivers.keys().copied()
    }
}

impl Default for DialectRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_cover_all_dialects() {
        let registry = DialectRegistry::with_builtins();
        assert_eq!(registry.ids().count(), 6);
        for id in [
            DialectId::Cisco,
            DialectId::Zyxel,
            DialectId::MyPower,
            DialectId::Oring,
            DialectId::Rubytech,
            DialectId::Arista,
        ] {
            assert!(registry.get(id).is_some(), "missing driver for {id}");
        }
    }

    #[test]
    fn test_resolve_unknown_is_none() {
        let registry = DialectRegistry::with_builtins();
        assert!(registry.resolve("juniper_junos").is_none());
        assert!(registry.resolve("cisco_ios_telnet").is_some());
    }
}
