//! Highlight and visibility rules for feed items.
//!
//! User preferences are compiled into an ordered list of rule groups. Each
//! group joins its criteria with a combinator, and all groups must pass for an
//! item to be highlighted. Adding a criterion means adding a `Criterion`
//! variant; `evaluate` stays untouched.

use std::collections::{HashMap, HashSet};

use crate::types::FeedItem;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Combinator {
    #[default]
    And,
    Or,
}

impl Combinator {
    pub fn toggled(self) -> Self {
        match self {
            Combinator::And => Combinator::Or,
            Combinator::Or => Combinator::And,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
        }
    }
}

impl std::str::FromStr for Combinator {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Combinator::And),
            "OR" => Ok(Combinator::Or),
            _ => Err(anyhow::anyhow!("Invalid combinator '{s}'. Valid options: AND, OR")),
        }
    }
}

impl std::fmt::Display for Combinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-configured thresholds. Thresholds are minimums, ceilings are maximums.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleSet {
    pub follower_threshold: u64,
    pub notable_follower_threshold: u64,
    pub combinator: Combinator,
    pub rename_ceiling: u64,
    pub contract_ceiling: u64,
    pub show_only_matching: bool,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            follower_threshold: 1000,
            notable_follower_threshold: 0,
            combinator: Combinator::And,
            rename_ceiling: 1,
            contract_ceiling: 1,
            show_only_matching: false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Criterion {
    MinFollowers(u64),
    MinNotableFollowers(u64),
    MaxRenames(u64),
    MaxContracts(u64),
}

impl Criterion {
    pub fn name(&self) -> &'static str {
        match self {
            Criterion::MinFollowers(_) => "followers",
            Criterion::MinNotableFollowers(_) => "notable followers",
            Criterion::MaxRenames(_) => "renames",
            Criterion::MaxContracts(_) => "contracts",
        }
    }

    pub fn check(&self, item: &FeedItem) -> bool {
        match *self {
            Criterion::MinFollowers(min) => item.followers_count >= min,
            Criterion::MinNotableFollowers(min) => item.notable_follower_count() >= min,
            Criterion::MaxRenames(max) => item.rename_count() <= max,
            Criterion::MaxContracts(max) => item.unique_contract_count <= max,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleGroup {
    pub label: &'static str,
    pub combinator: Combinator,
    pub criteria: Vec<Criterion>,
}

impl RuleGroup {
    /// An empty group never restricts anything.
    pub fn matches(&self, item: &FeedItem) -> bool {
        if self.criteria.is_empty() {
            return true;
        }
        match self.combinator {
            Combinator::And => self.criteria.iter().all(|c| c.check(item)),
            Combinator::Or => self.criteria.iter().any(|c| c.check(item)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledRules {
    pub groups: Vec<RuleGroup>,
    pub show_only_matching: bool,
}

impl RuleSet {
    /// Reach criteria combine with the user's choice of AND/OR; identity
    /// stability criteria always combine with AND.
    pub fn compile(&self) -> CompiledRules {
        CompiledRules {
            groups: vec![
                RuleGroup {
                    label: "reach",
                    combinator: self.combinator,
                    criteria: vec![
                        Criterion::MinFollowers(self.follower_threshold),
                        Criterion::MinNotableFollowers(self.notable_follower_threshold),
                    ],
                },
                RuleGroup {
                    label: "stability",
                    combinator: Combinator::And,
                    criteria: vec![
                        Criterion::MaxRenames(self.rename_ceiling),
                        Criterion::MaxContracts(self.contract_ceiling),
                    ],
                },
            ],
            show_only_matching: self.show_only_matching,
        }
    }
}

/// Membership lookup for excluded identities.
pub trait BlockLookup {
    fn is_blocked(&self, identity_id: &str) -> bool;
}

impl BlockLookup for HashSet<String> {
    fn is_blocked(&self, identity_id: &str) -> bool {
        self.contains(identity_id)
    }
}

impl<V> BlockLookup for HashMap<String, V> {
    fn is_blocked(&self, identity_id: &str) -> bool {
        self.contains_key(identity_id)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Verdict {
    pub highlighted: bool,
    pub visible: bool,
}

pub fn is_highlighted(item: &FeedItem, rules: &CompiledRules) -> bool {
    rules.groups.iter().all(|g| g.matches(item))
}

pub fn evaluate<B: BlockLookup + ?Sized>(item: &FeedItem, rules: &CompiledRules, blocked: &B) -> Verdict {
    let highlighted = is_highlighted(item, rules);
    let excluded = blocked.is_blocked(item.identity_id());
    Verdict {
        highlighted,
        visible: !excluded && (!rules.show_only_matching || highlighted),
    }
}

/// Evaluate a whole feed. Results are index-aligned with `items`.
pub fn evaluate_all<B: BlockLookup + ?Sized>(items: &[FeedItem], rules: &CompiledRules, blocked: &B) -> Vec<Verdict> {
    items.iter().map(|item| evaluate(item, rules, blocked)).collect()
}

/// Per-criterion outcome for display, in rule order.
pub fn explain(item: &FeedItem, rules: &CompiledRules) -> Vec<(&'static str, bool)> {
    rules
        .groups
        .iter()
        .flat_map(|g| g.criteria.iter().map(|c| (c.name(), c.check(item))))
        .collect()
}

/// Parse a user-typed threshold. Negative values clamp to zero, fractions are
/// floored and anything non-numeric reads as zero.
pub fn parse_threshold(input: &str) -> u64 {
    let trimmed = input.trim();
    if let Ok(v) = trimmed.parse::<u64>() {
        return v;
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v.floor().min(u64::MAX as f64) as u64,
        _ => 0,
    }
}
