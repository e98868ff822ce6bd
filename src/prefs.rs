//! Persisted highlight/filter preferences.
//!
//! Every setter writes exactly one key; values never round-trip through the
//! store on read, so one setter cannot clobber another.

use crate::filter::{Combinator, RuleSet};
use crate::store::{DurableKv, KvStore};

pub const KEY_FOLLOWER_THRESHOLD: &str = "follower_threshold";
pub const KEY_NOTABLE_FOLLOWER_THRESHOLD: &str = "notable_follower_threshold";
pub const KEY_RENAME_CEILING: &str = "rename_ceiling";
pub const KEY_CONTRACT_CEILING: &str = "contract_ceiling";
pub const KEY_FOLLOWER_LOGIC: &str = "follower_logic";
pub const KEY_SHOW_ONLY_MATCHING: &str = "show_only_matching";

const RULE_KEYS: &[&str] = &[
    KEY_FOLLOWER_THRESHOLD,
    KEY_NOTABLE_FOLLOWER_THRESHOLD,
    KEY_RENAME_CEILING,
    KEY_CONTRACT_CEILING,
    KEY_FOLLOWER_LOGIC,
    KEY_SHOW_ONLY_MATCHING,
];

/// Numeric thresholds the user can edit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ThresholdField {
    Followers,
    NotableFollowers,
    Renames,
    Contracts,
}

impl ThresholdField {
    pub const ALL: [ThresholdField; 4] = [
        ThresholdField::Followers,
        ThresholdField::NotableFollowers,
        ThresholdField::Renames,
        ThresholdField::Contracts,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ThresholdField::Followers => "min followers",
            ThresholdField::NotableFollowers => "min notable followers",
            ThresholdField::Renames => "max renames",
            ThresholdField::Contracts => "max contracts",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            ThresholdField::Followers => KEY_FOLLOWER_THRESHOLD,
            ThresholdField::NotableFollowers => KEY_NOTABLE_FOLLOWER_THRESHOLD,
            ThresholdField::Renames => KEY_RENAME_CEILING,
            ThresholdField::Contracts => KEY_CONTRACT_CEILING,
        }
    }

    pub fn next(self) -> Self {
        match self {
            ThresholdField::Followers => ThresholdField::NotableFollowers,
            ThresholdField::NotableFollowers => ThresholdField::Renames,
            ThresholdField::Renames => ThresholdField::Contracts,
            ThresholdField::Contracts => ThresholdField::Followers,
        }
    }
}

pub struct Preferences {
    kv: DurableKv,
    rules: RuleSet,
}

fn parse_u64(raw: Option<String>, key: &str, default: u64) -> u64 {
    match raw {
        None => default,
        Some(s) => s.trim().parse().unwrap_or_else(|_| {
            log::warn!("[prefs] ignoring malformed {key}={s:?}");
            default
        }),
    }
}

fn parse_bool(raw: Option<String>, key: &str, default: bool) -> bool {
    match raw.as_deref().map(str::trim) {
        None => default,
        Some("true") => true,
        Some("false") => false,
        Some(other) => {
            log::warn!("[prefs] ignoring malformed {key}={other:?}");
            default
        }
    }
}

impl Preferences {
    /// Load rules from the store, falling back to defaults key by key.
    pub fn load(store: Box<dyn KvStore>) -> Self {
        let kv = DurableKv::new(store);
        let d = RuleSet::default();

        let combinator = match kv.read(KEY_FOLLOWER_LOGIC) {
            None => d.combinator,
            Some(s) => s.parse::<Combinator>().unwrap_or_else(|e| {
                log::warn!("[prefs] {e}");
                d.combinator
            }),
        };

        let rules = RuleSet {
            follower_threshold: parse_u64(kv.read(KEY_FOLLOWER_THRESHOLD), KEY_FOLLOWER_THRESHOLD, d.follower_threshold),
            notable_follower_threshold: parse_u64(
                kv.read(KEY_NOTABLE_FOLLOWER_THRESHOLD),
                KEY_NOTABLE_FOLLOWER_THRESHOLD,
                d.notable_follower_threshold,
            ),
            combinator,
            rename_ceiling: parse_u64(kv.read(KEY_RENAME_CEILING), KEY_RENAME_CEILING, d.rename_ceiling),
            contract_ceiling: parse_u64(kv.read(KEY_CONTRACT_CEILING), KEY_CONTRACT_CEILING, d.contract_ceiling),
            show_only_matching: parse_bool(kv.read(KEY_SHOW_ONLY_MATCHING), KEY_SHOW_ONLY_MATCHING, d.show_only_matching),
        };
        log::info!("[prefs] loaded rules: {rules:?}");
        Self { kv, rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn is_volatile(&self) -> bool {
        self.kv.is_volatile()
    }

    pub fn threshold(&self, field: ThresholdField) -> u64 {
        match field {
            ThresholdField::Followers => self.rules.follower_threshold,
            ThresholdField::NotableFollowers => self.rules.notable_follower_threshold,
            ThresholdField::Renames => self.rules.rename_ceiling,
            ThresholdField::Contracts => self.rules.contract_ceiling,
        }
    }

    pub fn set_threshold(&mut self, field: ThresholdField, value: u64) {
        let slot = match field {
            ThresholdField::Followers => &mut self.rules.follower_threshold,
            ThresholdField::NotableFollowers => &mut self.rules.notable_follower_threshold,
            ThresholdField::Renames => &mut self.rules.rename_ceiling,
            ThresholdField::Contracts => &mut self.rules.contract_ceiling,
        };
        *slot = value;
        self.kv.write(field.key(), &value.to_string());
    }

    pub fn set_follower_threshold(&mut self, value: u64) {
        self.set_threshold(ThresholdField::Followers, value);
    }

    pub fn set_notable_follower_threshold(&mut self, value: u64) {
        self.set_threshold(ThresholdField::NotableFollowers, value);
    }

    pub fn set_rename_ceiling(&mut self, value: u64) {
        self.set_threshold(ThresholdField::Renames, value);
    }

    pub fn set_contract_ceiling(&mut self, value: u64) {
        self.set_threshold(ThresholdField::Contracts, value);
    }

    pub fn set_combinator(&mut self, combinator: Combinator) {
        self.rules.combinator = combinator;
        self.kv.write(KEY_FOLLOWER_LOGIC, combinator.as_str());
    }

    pub fn set_show_only_matching(&mut self, on: bool) {
        self.rules.show_only_matching = on;
        self.kv.write(KEY_SHOW_ONLY_MATCHING, if on { "true" } else { "false" });
    }

    /// Forget all stored rule values and go back to defaults.
    pub fn reset(&mut self) {
        for key in RULE_KEYS {
            self.kv.delete(key);
        }
        self.rules = RuleSet::default();
        log::info!("[prefs] rules reset to defaults");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::BrokenStore;
    use crate::store::MemoryStore;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_empty() {
        let prefs = Preferences::load(Box::new(MemoryStore::new()));
        assert_eq!(prefs.rules(), &RuleSet::default());
    }

    #[test]
    fn test_setter_writes_only_its_key() {
        let store = MemoryStore::new();
        let mut prefs = Preferences::load(Box::new(store.clone()));
        prefs.set_rename_ceiling(4);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(KEY_RENAME_CEILING).unwrap().as_deref(), Some("4"));
        assert_eq!(prefs.rules().follower_threshold, 1000);
    }

    #[test]
    fn test_malformed_values_fall_back() {
        let mut store = MemoryStore::new();
        store.set(KEY_FOLLOWER_THRESHOLD, "lots").unwrap();
        store.set(KEY_FOLLOWER_LOGIC, "XOR").unwrap();
        store.set(KEY_SHOW_ONLY_MATCHING, "yes").unwrap();
        store.set(KEY_CONTRACT_CEILING, "7").unwrap();
        let prefs = Preferences::load(Box::new(store));
        let r = prefs.rules();
        assert_eq!(r.follower_threshold, 1000);
        assert_eq!(r.combinator, Combinator::And);
        assert!(!r.show_only_matching);
        assert_eq!(r.contract_ceiling, 7);
    }

    #[test]
    fn test_write_failure_keeps_memory_value() {
        let mut prefs = Preferences::load(Box::new(BrokenStore { seeded: HashMap::new() }));
        prefs.set_follower_threshold(5);
        assert!(prefs.is_volatile());
        assert_eq!(prefs.rules().follower_threshold, 5);
        prefs.set_combinator(Combinator::Or);
        assert_eq!(prefs.rules().combinator, Combinator::Or);
    }

    #[test]
    fn test_reset_clears_keys() {
        let store = MemoryStore::new();
        let mut prefs = Preferences::load(Box::new(store.clone()));
        prefs.set_show_only_matching(true);
        prefs.set_notable_follower_threshold(3);
        prefs.reset();
        assert!(store.is_empty());
        assert_eq!(prefs.rules(), &RuleSet::default());
    }
}
