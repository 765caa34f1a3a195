//! Pin registry
//!
//! The static pin table from configuration plus each pin's last known
//! level. Levels are only written through [`PinRegistry::record`], which
//! is crate-private and called by the pin controller.

use std::collections::BTreeMap;

use dashmap::DashMap;

use dl_core::config::PinConfig;
use dl_core::{PinId, PinRole, Pull};

/// A registry entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinEntry {
    /// Display name
    pub name: String,
    /// Input or output
    pub role: PinRole,
    /// Pull resistor setting
    pub pull: Pull,
    /// Level driven at startup
    pub initial: bool,
    /// Last known logical level
    pub state: bool,
}

/// Table of configured pins
#[derive(Debug, Default)]
pub struct PinRegistry {
    pins: DashMap<PinId, PinEntry>,
}

impl PinRegistry {
    /// Build the registry from configuration
    pub fn from_config(pins: &[PinConfig]) -> Self {
        let registry = Self::default();
        for pin in pins {
            registry.pins.insert(
                pin.pin,
                PinEntry {
                    name: pin.name.clone(),
                    role: pin.role,
                    pull: pin.pull,
                    initial: pin.initial,
                    state: pin.initial && pin.role == PinRole::Output,
                },
            );
        }
        registry
    }

    /// Look up a pin
    pub fn get(&self, pin: PinId) -> Option<PinEntry> {
        self.pins.get(&pin).map(|entry| entry.clone())
    }

    /// Update a pin's last known level
    pub(crate) fn record(&self, pin: PinId, state: bool) {
        if let Some(mut entry) = self.pins.get_mut(&pin) {
            entry.state = state;
        }
    }

    /// All pins, ordered by pin number
    pub fn entries(&self) -> Vec<(PinId, PinEntry)> {
        let mut entries: Vec<_> = self
            .pins
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        entries.sort_by_key(|(pin, _)| *pin);
        entries
    }

    /// Input pins with their names, ordered by pin number
    pub fn inputs(&self) -> Vec<(PinId, String)> {
        self.entries()
            .into_iter()
            .filter(|(_, entry)| entry.role == PinRole::Input)
            .map(|(pin, entry)| (pin, entry.name))
            .collect()
    }

    /// Last known level of every pin
    pub fn states(&self) -> BTreeMap<PinId, bool> {
        self.pins
            .iter()
            .map(|entry| (*entry.key(), entry.value().state))
            .collect()
    }

    /// Number of configured pins
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    /// Check if no pins are configured
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dl_core::config::AgentConfig;

    #[test]
    fn test_from_default_config() {
        let registry = PinRegistry::from_config(&AgentConfig::default().pins);
        assert_eq!(registry.len(), 3);

        let relay = registry.get(PinId::new(17)).unwrap();
        assert_eq!(relay.name, "relay_1");
        assert_eq!(relay.role, PinRole::Output);
        assert!(!relay.state);

        assert_eq!(
            registry.inputs(),
            vec![(PinId::new(23), "motion_sensor".to_string())]
        );
    }

    #[test]
    fn test_record_and_states() {
        let registry = PinRegistry::from_config(&[
            PinConfig::output(5, "fan"),
            PinConfig::input(6, "door", Pull::Up),
        ]);
        registry.record(PinId::new(5), true);
        registry.record(PinId::new(99), true);

        let states = registry.states();
        assert_eq!(states.len(), 2);
        assert!(states[&PinId::new(5)]);
        assert!(!states[&PinId::new(6)]);
        assert!(registry.get(PinId::new(99)).is_none());
    }
}
