use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::UserInfo;
use crate::utils::AppError;

pub const NAME_MAX_CHARS: usize = 50;
pub const DESCRIPTION_MAX_CHARS: usize = 200;
pub const FRONT_MAX_CHARS: usize = 200;
pub const BACK_MAX_CHARS: usize = 500;

/// Who can see a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    /// Owner only
    #[default]
    Private,
    /// Listed in browse/search and reachable by id
    Public,
    /// Reachable by id, never listed
    Unlisted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Languages,
    Science,
    Mathematics,
    History,
    Geography,
    Programming,
    Arts,
    Music,
    Other,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Languages,
        Category::Science,
        Category::Mathematics,
        Category::History,
        Category::Geography,
        Category::Programming,
        Category::Arts,
        Category::Music,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Languages => "LANGUAGES",
            Category::Science => "SCIENCE",
            Category::Mathematics => "MATHEMATICS",
            Category::History => "HISTORY",
            Category::Geography => "GEOGRAPHY",
            Category::Programming => "PROGRAMMING",
            Category::Arts => "ARTS",
            Category::Music => "MUSIC",
            Category::Other => "OTHER",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AppError;

    /// Case-insensitive; `"Languages"` and `"LANGUAGES"` both parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AppError::Validation(format!("Unknown category '{}'", wanted)))
    }
}

/// Card embedded in its parent set document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub front: String,
    pub back: String,
}

/// Set document as stored. Cards live inside the set so that a set and its
/// cards are written as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Set {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    /// Owner
    pub user_id: String,

    pub name: String,
    pub description: String,

    #[serde(default)]
    pub category: Option<Category>,

    #[serde(default)]
    pub visibility: Visibility,

    pub cards: Vec<Card>,

    pub created_at: i64,
    pub updated_at: i64,
}

impl Set {
    /// Builds a new set owned by `user_id` from an already validated draft.
    pub fn from_draft(user_id: &str, draft: SetDraft) -> Self {
        let now = chrono::Utc::now().timestamp();
        Set {
            id: ObjectId::new(),
            user_id: user_id.to_string(),
            name: draft.name,
            description: draft.description,
            category: draft.category,
            visibility: draft.visibility,
            cards: draft.cards.into_iter().map(CardDraft::into_card).collect(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn summary(&self) -> SetSummary {
        SetSummary {
            id: self.id.to_hex(),
            user_id: self.user_id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category,
            visibility: self.visibility,
            card_count: self.cards.len() as u64,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CardDraft {
    pub front: String,
    pub back: String,
}

impl CardDraft {
    /// Every conversion mints a new id; card identity is not kept across updates.
    pub fn into_card(self) -> Card {
        Card {
            id: ObjectId::new(),
            front: self.front,
            back: self.back,
        }
    }
}

/// Body of create and update requests. Update replaces the whole set.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SetDraft {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub visibility: Visibility,
    pub cards: Vec<CardDraft>,
}

fn check_text(field: &str, value: &str, min: usize, max: usize) -> Result<(), AppError> {
    let len = value.chars().count();
    if min > 0 && value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    if len < min || len > max {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

impl SetDraft {
    pub fn validate(&self) -> Result<(), AppError> {
        check_text("name", &self.name, 1, NAME_MAX_CHARS)?;
        check_text("description", &self.description, 1, DESCRIPTION_MAX_CHARS)?;

        if self.cards.is_empty() {
            return Err(AppError::Validation(
                "A set needs at least one card".to_string(),
            ));
        }

        for (i, card) in self.cards.iter().enumerate() {
            check_text(&format!("cards[{}].front", i), &card.front, 0, FRONT_MAX_CHARS)?;
            check_text(&format!("cards[{}].back", i), &card.back, 0, BACK_MAX_CHARS)?;
        }

        Ok(())
    }
}

/// Browse/search filter for public sets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetFilter {
    pub query: Option<String>,
    pub category: Option<Category>,
    pub limit: i64,
    pub offset: i64,
}

impl SetFilter {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 200;

    /// Case-insensitive substring match on the set name.
    pub fn matches(&self, set: &Set) -> bool {
        if let Some(query) = &self.query {
            if !set.name.to_lowercase().contains(&query.to_lowercase()) {
                return false;
            }
        }
        match self.category {
            Some(category) => set.category == Some(category),
            None => true,
        }
    }
}

/// Listing row: no card bodies, only the count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SetSummary {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub category: Option<Category>,
    pub visibility: Visibility,
    pub card_count: u64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One page of a public listing. `total` counts every match, not just
/// the rows in `sets`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetPage {
    pub sets: Vec<SetSummary>,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CardResponse {
    pub id: String,
    pub set_id: String,
    pub front: String,
    pub back: String,
}

/// Full set with cards and the owner's public profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SetDetail {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: Option<Category>,
    pub visibility: Visibility,
    pub owner: UserInfo,
    pub cards: Vec<CardResponse>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl SetDetail {
    pub fn new(set: Set, owner: UserInfo) -> Self {
        let set_id = set.id.to_hex();
        let cards = set
            .cards
            .into_iter()
            .map(|card| CardResponse {
                id: card.id.to_hex(),
                set_id: set_id.clone(),
                front: card.front,
                back: card.back,
            })
            .collect();

        SetDetail {
            id: set_id,
            name: set.name,
            description: set.description,
            category: set.category,
            visibility: set.visibility,
            owner,
            cards,
            created_at: set.created_at,
            updated_at: set.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(cards: usize) -> SetDraft {
        SetDraft {
            name: "Spanish verbs".to_string(),
            description: "Common irregular verbs".to_string(),
            category: Some(Category::Languages),
            visibility: Visibility::Public,
            cards: (0..cards)
                .map(|i| CardDraft {
                    front: format!("front {}", i),
                    back: format!("back {}", i),
                })
                .collect(),
        }
    }

    #[test]
    fn test_valid_draft() {
        assert!(draft(3).validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_card_list() {
        assert!(matches!(draft(0).validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_length_limits_count_characters() {
        let mut d = draft(1);
        d.name = "ñ".repeat(NAME_MAX_CHARS);
        assert!(d.validate().is_ok());

        d.name.push('ñ');
        assert!(matches!(d.validate(), Err(AppError::Validation(_))));

        let mut d = draft(1);
        d.description = "x".repeat(DESCRIPTION_MAX_CHARS + 1);
        assert!(d.validate().is_err());

        let mut d = draft(1);
        d.cards[0].front = "x".repeat(FRONT_MAX_CHARS + 1);
        assert!(d.validate().is_err());

        let mut d = draft(1);
        d.cards[0].back = "x".repeat(BACK_MAX_CHARS);
        assert!(d.validate().is_ok());
        d.cards[0].back.push('x');
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_blank_name_rejected() {
        let mut d = draft(1);
        d.name = "   ".to_string();
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_unknown_category_rejected_by_serde() {
        let body = serde_json::json!({
            "name": "n", "description": "d", "category": "ASTROLOGY",
            "visibility": "PUBLIC", "cards": [{"front": "a", "back": "b"}]
        });
        assert!(serde_json::from_value::<SetDraft>(body).is_err());
    }

    #[test]
    fn test_draft_defaults_to_private_without_category() {
        let body = serde_json::json!({
            "name": "n", "description": "d", "cards": [{"front": "a", "back": "b"}]
        });
        let d: SetDraft = serde_json::from_value(body).unwrap();
        assert_eq!(d.visibility, Visibility::Private);
        assert_eq!(d.category, None);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("languages".parse::<Category>().unwrap(), Category::Languages);
        assert_eq!(" SCIENCE ".parse::<Category>().unwrap(), Category::Science);
        assert!("All".parse::<Category>().is_err());
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let set = Set::from_draft("u1", draft(1));
        let filter = SetFilter {
            query: Some("SPANISH".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&set));

        let filter = SetFilter {
            query: Some("german".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&set));

        let filter = SetFilter {
            category: Some(Category::Science),
            ..Default::default()
        };
        assert!(!filter.matches(&set));
    }

    #[test]
    fn test_from_draft_mints_card_ids() {
        let set = Set::from_draft("u1", draft(2));
        assert_eq!(set.cards.len(), 2);
        assert_ne!(set.cards[0].id, set.cards[1].id);
        assert_eq!(set.summary().card_count, 2);
    }
}
