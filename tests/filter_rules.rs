//! Rule engine properties across the public API: threshold monotonicity,
//! block-list exclusion and the two reference scenarios.

use std::collections::HashSet;

use feedx::filter::{evaluate, evaluate_all, is_highlighted, Combinator, RuleSet};
use feedx::types::{FeedItem, NotableFollower};

fn item(id: &str, followers: u64, notable: usize, names: usize, contracts: u64) -> FeedItem {
    FeedItem {
        tweet_id: format!("t{id}"),
        user_id: id.to_string(),
        screen_name: format!("user{id}"),
        followers_count: followers,
        unique_contract_count: contracts,
        historical_screen_names: (0..names).map(|i| format!("name{i}")).collect(),
        notable_followers: (0..notable)
            .map(|i| NotableFollower { follower_id: i.to_string(), ..Default::default() })
            .collect(),
        ..Default::default()
    }
}

fn sample_feed() -> Vec<FeedItem> {
    let mut feed = Vec::new();
    let mut n = 0;
    for followers in [0, 500, 1000, 5000, 100_000] {
        for notable in [0, 1, 3] {
            for names in [0, 1, 2, 4] {
                for contracts in [0, 1, 3] {
                    n += 1;
                    feed.push(item(&n.to_string(), followers, notable, names, contracts));
                }
            }
        }
    }
    feed
}

fn highlighted_ids(feed: &[FeedItem], rules: &RuleSet) -> HashSet<String> {
    let compiled = rules.compile();
    feed.iter()
        .filter(|it| is_highlighted(it, &compiled))
        .map(|it| it.user_id.clone())
        .collect()
}

#[test]
fn raising_a_threshold_never_adds_highlights() {
    let feed = sample_feed();
    let base = RuleSet { combinator: Combinator::And, ..RuleSet::default() };

    for step in [0u64, 1, 500, 1000, 5000] {
        let lower = RuleSet { follower_threshold: step, ..base.clone() };
        let higher = RuleSet { follower_threshold: step + 1000, ..base.clone() };
        assert!(highlighted_ids(&feed, &higher).is_subset(&highlighted_ids(&feed, &lower)));

        let lower = RuleSet { notable_follower_threshold: step.min(3), ..base.clone() };
        let higher = RuleSet { notable_follower_threshold: step.min(3) + 1, ..base.clone() };
        assert!(highlighted_ids(&feed, &higher).is_subset(&highlighted_ids(&feed, &lower)));
    }
}

#[test]
fn raising_a_ceiling_never_removes_highlights() {
    let feed = sample_feed();
    let base = RuleSet { follower_threshold: 0, ..RuleSet::default() };

    for ceiling in 0u64..4 {
        let lower = RuleSet { rename_ceiling: ceiling, ..base.clone() };
        let higher = RuleSet { rename_ceiling: ceiling + 1, ..base.clone() };
        assert!(highlighted_ids(&feed, &lower).is_subset(&highlighted_ids(&feed, &higher)));

        let lower = RuleSet { contract_ceiling: ceiling, ..base.clone() };
        let higher = RuleSet { contract_ceiling: ceiling + 1, ..base.clone() };
        assert!(highlighted_ids(&feed, &lower).is_subset(&highlighted_ids(&feed, &higher)));
    }
}

#[test]
fn reference_scenario_rename_ceiling() {
    let it = item("x", 500, 2, 3, 0);
    let rules = RuleSet {
        follower_threshold: 1000,
        notable_follower_threshold: 1,
        combinator: Combinator::Or,
        rename_ceiling: 1,
        contract_ceiling: 1,
        show_only_matching: false,
    };
    assert!(!is_highlighted(&it, &rules.compile()));

    let relaxed = RuleSet { rename_ceiling: 2, ..rules };
    assert!(is_highlighted(&it, &relaxed.compile()));
}

#[test]
fn blocking_hides_regardless_of_rules_and_unblocking_restores() {
    let feed = vec![item("a", 50_000, 5, 1, 0), item("b", 10, 0, 1, 0), item("a", 0, 0, 9, 9)];
    let rules = RuleSet::default().compile();
    let mut blocked: HashSet<String> = HashSet::new();

    let before = evaluate_all(&feed, &rules, &blocked);

    blocked.insert("a".to_string());
    let during = evaluate_all(&feed, &rules, &blocked);
    assert!(!during[0].visible);
    assert!(!during[2].visible);
    assert!(during[1].visible);
    // highlighting is independent of the block-list
    assert_eq!(during[0].highlighted, before[0].highlighted);

    blocked.remove("a");
    assert_eq!(evaluate_all(&feed, &rules, &blocked), before);
}

#[test]
fn show_only_matching_hides_non_highlighted() {
    let rules = RuleSet { show_only_matching: true, ..RuleSet::default() }.compile();
    let none: HashSet<String> = HashSet::new();
    assert!(evaluate(&item("1", 2000, 0, 1, 0), &rules, &none).visible);
    assert!(!evaluate(&item("2", 20, 0, 1, 0), &rules, &none).visible);
}

#[test]
fn evaluation_is_order_independent() {
    let feed = sample_feed();
    let rules = RuleSet { combinator: Combinator::Or, notable_follower_threshold: 1, ..RuleSet::default() }.compile();
    let none: HashSet<String> = HashSet::new();
    let forward = evaluate_all(&feed, &rules, &none);

    let mut reversed_feed = feed.clone();
    reversed_feed.reverse();
    let mut backward = evaluate_all(&reversed_feed, &rules, &none);
    backward.reverse();
    assert_eq!(forward, backward);
}
