use serde::{Deserialize, Deserializer, Serialize};

use crate::scheduler::SchedulerView;

/// Treats an explicit `null` like a missing key.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(d).map(Option::unwrap_or_default)
}

/// Engagement details of a follower flagged as notable by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowerInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub screen_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, rename = "profile_image_url_https")]
    pub avatar_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub followers_count: u64,
    #[serde(default, deserialize_with = "null_as_default", rename = "friends_count")]
    pub following_count: u64,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotableFollower {
    #[serde(default, deserialize_with = "null_as_default", rename = "follower_id_str")]
    pub follower_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_info: FollowerInfo,
}

/// One monitored post together with the identity metadata of its author.
///
/// Every collection and counter is optional on the wire; missing or null values
/// deserialize to empty/zero so a partial record never fails the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub tweet_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub screen_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, rename = "profile_image_url")]
    pub avatar_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub tweet_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub followers_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub following_count: u64,
    #[serde(default)]
    pub contract_address: Option<String>,
    /// Unique contracts ever promoted by this identity.
    #[serde(default, deserialize_with = "null_as_default", rename = "pump_count")]
    pub unique_contract_count: u64,
    /// Every screen name this identity has used, current one included.
    #[serde(default, deserialize_with = "null_as_default", rename = "screen_names")]
    pub historical_screen_names: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default", rename = "kol_followers")]
    pub notable_followers: Vec<NotableFollower>,
}

impl FeedItem {
    /// Identity key used by the block-list. Falls back to the screen name for
    /// records that arrive without a user id.
    pub fn identity_id(&self) -> &str {
        if self.user_id.is_empty() {
            &self.screen_name
        } else {
            &self.user_id
        }
    }

    /// Number of times the identity changed its screen name. A missing history
    /// counts as the current name only.
    pub fn rename_count(&self) -> u64 {
        self.historical_screen_names.len().saturating_sub(1) as u64
    }

    pub fn notable_follower_count(&self) -> u64 {
        self.notable_followers.len() as u64
    }

    /// Names used before the current one, oldest first.
    pub fn previous_names(&self) -> Vec<&str> {
        self.historical_screen_names
            .iter()
            .map(String::as_str)
            .filter(|n| !n.eq_ignore_ascii_case(&self.screen_name))
            .collect()
    }

    /// Notable followers ordered by their own follower count, largest first.
    pub fn top_notable_followers(&self, limit: usize) -> Vec<&NotableFollower> {
        let mut sorted: Vec<&NotableFollower> = self.notable_followers.iter().collect();
        sorted.sort_by(|a, b| b.user_info.followers_count.cmp(&a.user_info.followers_count));
        sorted.truncate(limit);
        sorted
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// Dashboard viewers currently connected to the backend.
    #[serde(default, alias = "online_users", alias = "online")]
    pub active_viewers: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// Full ordered feed as returned by a single snapshot request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedSnapshot {
    pub items: Vec<FeedItem>,
    pub meta: SnapshotMeta,
}

/// Which detail endpoint a lookup went to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailKey {
    User(String),
    Token(String),
}

impl std::fmt::Display for DetailKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetailKey::User(name) => write!(f, "@{name}"),
            DetailKey::Token(ca) => write!(f, "CA {ca}"),
        }
    }
}

/// Requests from the UI to the refresh task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshCommand {
    SetAutoUpdate(bool),
    SetInteracting(bool),
    RefreshNow,
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    Snapshot(FeedSnapshot),
    FetchFailed(String),
    Schedule(SchedulerView),
    Detail {
        key: DetailKey,
        result: Result<serde_json::Value, String>,
    },
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default() {
        let item: FeedItem = serde_json::from_str(r#"{"user_id":"42","screen_name":"abc"}"#).unwrap();
        assert_eq!(item.followers_count, 0);
        assert_eq!(item.rename_count(), 0);
        assert_eq!(item.notable_follower_count(), 0);
        assert_eq!(item.identity_id(), "42");
    }

    #[test]
    fn test_null_fields_default() {
        let raw = r#"{
            "user_id": "42",
            "screen_name": "abc",
            "name": null,
            "followers_count": null,
            "pump_count": null,
            "screen_names": null,
            "kol_followers": [{"follower_id_str": "1", "user_info": null}, {"user_info": {"followers_count": null}}]
        }"#;
        let item: FeedItem = serde_json::from_str(raw).unwrap();
        assert_eq!(item.name, "");
        assert_eq!(item.followers_count, 0);
        assert_eq!(item.unique_contract_count, 0);
        assert_eq!(item.rename_count(), 0);
        assert_eq!(item.notable_follower_count(), 2);
        assert_eq!(item.notable_followers[0].user_info, FollowerInfo::default());
    }

    #[test]
    fn test_wire_names() {
        let raw = r#"{
            "tweet_id": "t1",
            "user_id": "7",
            "screen_name": "new_name",
            "name": "Someone",
            "followers_count": 1500,
            "following_count": 20,
            "pump_count": 3,
            "screen_names": ["old_name", "mid_name", "new_name"],
            "kol_followers": [
                {"follower_id_str": "1", "user_info": {"screen_name": "a", "followers_count": 10}},
                {"follower_id_str": "2", "user_info": {"screen_name": "b", "followers_count": 900, "friends_count": 4, "note": "VC"}}
            ]
        }"#;
        let item: FeedItem = serde_json::from_str(raw).unwrap();
        assert_eq!(item.unique_contract_count, 3);
        assert_eq!(item.rename_count(), 2);
        assert_eq!(item.previous_names(), vec!["old_name", "mid_name"]);

        let top = item.top_notable_followers(30);
        assert_eq!(top[0].user_info.screen_name, "b");
        assert_eq!(top[0].user_info.following_count, 4);
        assert_eq!(top[0].user_info.note.as_deref(), Some("VC"));
    }

    #[test]
    fn test_identity_falls_back_to_screen_name() {
        let item = FeedItem { screen_name: "anon".into(), ..Default::default() };
        assert_eq!(item.identity_id(), "anon");
    }
}
