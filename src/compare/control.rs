//! Negative-control resolution.
//!
//! Every WellKey is compared against the control well of the same plate and
//! strain. The rule lives here, in one place, instead of as a well-name check
//! scattered through the pipeline.

use std::collections::BTreeMap;

use crate::domain::{ScoreConfig, WellId, WellKey};
use crate::error::ScoreError;

/// Maps a WellKey to its negative-control WellKey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlRule {
    control_well: WellId,
}

impl ControlRule {
    pub fn new(control_well: WellId) -> Self {
        Self { control_well }
    }

    pub fn control_well(&self) -> &WellId {
        &self.control_well
    }

    /// Control WellKey for `key`: same strain and plate, control well.
    pub fn control_for(&self, key: &WellKey) -> WellKey {
        key.with_well(self.control_well.clone())
    }

    pub fn is_control(&self, key: &WellKey) -> bool {
        key.well == self.control_well
    }

    /// Look up the control entry for `key` in a keyed collection.
    pub fn resolve<'a, V>(&self, key: &WellKey, groups: &'a BTreeMap<WellKey, V>) -> Result<&'a V, ScoreError> {
        let control = self.control_for(key);
        match groups.get(&control) {
            Some(v) => Ok(v),
            None => Err(ScoreError::MissingControl {
                key: key.clone(),
                control,
            }),
        }
    }
}

impl Default for ControlRule {
    fn default() -> Self {
        Self::new(WellId::new("A1"))
    }
}

impl From<&ScoreConfig> for ControlRule {
    fn from(config: &ScoreConfig) -> Self {
        Self::new(config.control_well.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_shares_plate_and_strain() {
        let rule = ControlRule::default();
        let key = WellKey::new("WT", "PM1", "H12");
        assert_eq!(rule.control_for(&key), WellKey::new("WT", "PM1", "A1"));
        assert!(!rule.is_control(&key));
        assert!(rule.is_control(&WellKey::new("WT", "PM2", "a1")));
    }

    #[test]
    fn resolve_reports_missing_control() {
        let rule = ControlRule::default();
        let mut groups = BTreeMap::new();
        groups.insert(WellKey::new("WT", "PM1", "A1"), 1);
        groups.insert(WellKey::new("WT", "PM1", "B2"), 2);
        groups.insert(WellKey::new("dA", "PM1", "B2"), 3);

        assert_eq!(rule.resolve(&WellKey::new("WT", "PM1", "B2"), &groups), Ok(&1));

        let orphan = WellKey::new("dA", "PM1", "B2");
        assert_eq!(
            rule.resolve(&orphan, &groups),
            Err(ScoreError::MissingControl {
                key: orphan.clone(),
                control: WellKey::new("dA", "PM1", "A1"),
            })
        );
    }

    #[test]
    fn control_well_is_configurable() {
        let config = ScoreConfig {
            control_well: WellId::new("H12"),
            ..ScoreConfig::default()
        };
        let rule = ControlRule::from(&config);
        assert_eq!(
            rule.control_for(&WellKey::new("WT", "PM1", "B1")).well,
            WellId::new("H12")
        );
    }
}
