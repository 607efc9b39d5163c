use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Location of a child record: the principal whose sub-collection holds it, plus its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChildKey {
    pub owner_id: String,
    pub id: String,
}

/// A check-in or note as seen by the cleanup job.
///
/// `goal_id`/`user_id` are a weak back-reference to a goal; either may be
/// missing on legacy rows. Payload columns are never loaded here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChildRecord {
    pub owner_id: String,
    pub id: String,
    pub goal_id: Option<String>,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ChildRecord {
    pub fn key(&self) -> ChildKey {
        ChildKey {
            owner_id: self.owner_id.clone(),
            id: self.id.clone(),
        }
    }

    /// The `(user_id, goal_id)` pair this record points at, if both are present and non-empty.
    pub fn goal_ref(&self) -> Option<(&str, &str)> {
        let user_id = self.user_id.as_deref().filter(|s| !s.is_empty())?;
        let goal_id = self.goal_id.as_deref().filter(|s| !s.is_empty())?;
        Some((user_id, goal_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(goal_id: Option<&str>, user_id: Option<&str>) -> ChildRecord {
        ChildRecord {
            owner_id: "u1".to_string(),
            id: "c1".to_string(),
            goal_id: goal_id.map(String::from),
            user_id: user_id.map(String::from),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_goal_ref_requires_both_fields() {
        assert_eq!(record(Some("g1"), Some("u1")).goal_ref(), Some(("u1", "g1")));
        assert_eq!(record(None, Some("u1")).goal_ref(), None);
        assert_eq!(record(Some("g1"), None).goal_ref(), None);
    }

    #[test]
    fn test_goal_ref_treats_empty_as_missing() {
        assert_eq!(record(Some(""), Some("u1")).goal_ref(), None);
        assert_eq!(record(Some("g1"), Some("")).goal_ref(), None);
    }
}
