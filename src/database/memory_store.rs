use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::database::{SetStore, UserStore};
use crate::models::{Set, SetDraft, SetFilter, SetPage, SetSummary, User};
use crate::services::access_policy;
use crate::utils::AppError;

#[derive(Default)]
struct MemoryState {
    sets: HashMap<ObjectId, Set>,
    users: HashMap<String, User>,
}

/// In-process store for development and tests.
///
/// Writers hold the write lock for the whole mutation and build the new set
/// on a copy; the copy replaces the stored set only once it is complete.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    #[cfg(test)]
    fail_card_insert: std::sync::atomic::AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next card insertion of `replace_set` fail, after the old
    /// cards have already been dropped from the staged copy.
    #[cfg(test)]
    pub fn fail_next_card_insert(&self) {
        self.fail_card_insert
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    #[cfg(test)]
    fn card_insert_fault(&self) -> Result<(), AppError> {
        if self
            .fail_card_insert
            .swap(false, std::sync::atomic::Ordering::SeqCst)
        {
            return Err(AppError::Database("injected card insert failure".to_string()));
        }
        Ok(())
    }

    #[cfg(not(test))]
    fn card_insert_fault(&self) -> Result<(), AppError> {
        Ok(())
    }
}

fn newest_first(mut summaries: Vec<SetSummary>) -> Vec<SetSummary> {
    summaries.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| b.id.cmp(&a.id))
    });
    summaries
}

#[async_trait]
impl SetStore for MemoryStore {
    async fn insert_set(&self, set: &Set) -> Result<(), AppError> {
        if set.cards.is_empty() {
            return Err(AppError::Validation(
                "A set needs at least one card".to_string(),
            ));
        }
        let mut state = self.state.write().await;
        state.sets.insert(set.id, set.clone());
        Ok(())
    }

    async fn find_set(&self, id: &ObjectId) -> Result<Option<Set>, AppError> {
        Ok(self.state.read().await.sets.get(id).cloned())
    }

    async fn replace_set(
        &self,
        id: &ObjectId,
        user_id: &str,
        draft: SetDraft,
    ) -> Result<Option<Set>, AppError> {
        let mut state = self.state.write().await;

        let mut staged = match state.sets.get(id) {
            Some(set) if set.user_id == user_id => set.clone(),
            _ => return Ok(None),
        };

        staged.cards.clear();
        for card in draft.cards {
            self.card_insert_fault()?;
            staged.cards.push(card.into_card());
        }
        if staged.cards.is_empty() {
            return Err(AppError::Validation(
                "A set needs at least one card".to_string(),
            ));
        }

        staged.name = draft.name;
        staged.description = draft.description;
        staged.category = draft.category;
        staged.visibility = draft.visibility;
        staged.updated_at = chrono::Utc::now().timestamp();

        state.sets.insert(*id, staged.clone());
        Ok(Some(staged))
    }

    async fn delete_set(&self, id: &ObjectId, user_id: &str) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        match state.sets.get(id) {
            Some(set) if set.user_id == user_id => {
                state.sets.remove(id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_by_owner(&self, user_id: &str) -> Result<Vec<SetSummary>, AppError> {
        let state = self.state.read().await;
        let summaries = state
            .sets
            .values()
            .filter(|set| set.user_id == user_id)
            .map(Set::summary)
            .collect();
        Ok(newest_first(summaries))
    }

    async fn list_public(&self, filter: &SetFilter) -> Result<SetPage, AppError> {
        let state = self.state.read().await;
        let summaries: Vec<_> = state
            .sets
            .values()
            .filter(|set| access_policy::is_listed(set) && filter.matches(set))
            .map(Set::summary)
            .collect();
        let total = summaries.len() as u64;

        let sets = newest_first(summaries)
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect();
        Ok(SetPage { sets, total })
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.state.read().await.users.get(user_id).cloned())
    }

    async fn find_user_by_github_id(&self, github_id: i64) -> Result<Option<User>, AppError> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|u| u.github_id == Some(github_id))
            .cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        let duplicate = state.users.contains_key(&user.user_id)
            || (user.github_id.is_some()
                && state.users.values().any(|u| u.github_id == user.github_id));
        if duplicate {
            return Err(AppError::Database(format!(
                "duplicate user {}",
                user.user_id
            )));
        }
        state.users.insert(user.user_id.clone(), user.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CardDraft, Category, Visibility};

    fn draft(name: &str, visibility: Visibility, cards: &[(&str, &str)]) -> SetDraft {
        SetDraft {
            name: name.to_string(),
            description: "description".to_string(),
            category: Some(Category::Languages),
            visibility,
            cards: cards
                .iter()
                .map(|(f, b)| CardDraft {
                    front: f.to_string(),
                    back: b.to_string(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_failed_replace_keeps_previous_cards() {
        let store = MemoryStore::new();
        let set = Set::from_draft("owner", draft("Verbs", Visibility::Public, &[("ser", "to be"), ("ir", "to go")]));
        store.insert_set(&set).await.unwrap();

        store.fail_next_card_insert();
        let result = store
            .replace_set(&set.id, "owner", draft("Renamed", Visibility::Private, &[("tener", "to have")]))
            .await;
        assert!(matches!(result, Err(AppError::Database(_))));

        let stored = store.find_set(&set.id).await.unwrap().unwrap();
        assert_eq!(stored, set);
        assert_eq!(stored.cards.len(), 2);
    }

    #[tokio::test]
    async fn test_replace_mints_new_card_ids() {
        let store = MemoryStore::new();
        let set = Set::from_draft("owner", draft("Verbs", Visibility::Public, &[("ser", "to be")]));
        store.insert_set(&set).await.unwrap();

        let updated = store
            .replace_set(&set.id, "owner", draft("Verbs", Visibility::Public, &[("ser", "to be")]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.cards[0].front, "ser");
        assert_ne!(updated.cards[0].id, set.cards[0].id);
        assert_eq!(updated.created_at, set.created_at);
    }

    #[tokio::test]
    async fn test_replace_and_delete_require_owner() {
        let store = MemoryStore::new();
        let set = Set::from_draft("owner", draft("Verbs", Visibility::Public, &[("ser", "to be")]));
        store.insert_set(&set).await.unwrap();

        let other = store
            .replace_set(&set.id, "intruder", draft("Mine", Visibility::Public, &[("a", "b")]))
            .await
            .unwrap();
        assert!(other.is_none());
        assert!(!store.delete_set(&set.id, "intruder").await.unwrap());
        assert_eq!(store.find_set(&set.id).await.unwrap().unwrap(), set);

        assert!(store.delete_set(&set.id, "owner").await.unwrap());
        assert!(store.find_set(&set.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_public_excludes_private_and_unlisted() {
        let store = MemoryStore::new();
        for (name, visibility) in [
            ("Spanish 1", Visibility::Public),
            ("Spanish 2", Visibility::Private),
            ("Spanish 3", Visibility::Unlisted),
        ] {
            let set = Set::from_draft("owner", draft(name, visibility, &[("a", "b")]));
            store.insert_set(&set).await.unwrap();
        }

        let filter = SetFilter {
            limit: SetFilter::DEFAULT_LIMIT,
            ..Default::default()
        };
        let listed = store.list_public(&filter).await.unwrap();
        assert_eq!(listed.total, 1);
        assert_eq!(listed.sets[0].name, "Spanish 1");

        assert_eq!(store.list_by_owner("owner").await.unwrap().len(), 3);
        assert!(store.list_by_owner("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_public_paginates() {
        let store = MemoryStore::new();
        for i in 0..5 {
            let mut set = Set::from_draft("owner", draft(&format!("Set {}", i), Visibility::Public, &[("a", "b")]));
            set.updated_at = i;
            store.insert_set(&set).await.unwrap();
        }

        let filter = SetFilter {
            limit: 2,
            offset: 1,
            ..Default::default()
        };
        let page = store.list_public(&filter).await.unwrap();
        assert_eq!(page.total, 5);
        let names: Vec<_> = page.sets.into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Set 3", "Set 2"]);
    }

    #[tokio::test]
    async fn test_duplicate_github_user_rejected() {
        let store = MemoryStore::new();
        let user = User {
            user_id: "u1".to_string(),
            name: Some("Ada".to_string()),
            image: None,
            github_id: Some(42),
            created_at: 0,
        };
        store.insert_user(&user).await.unwrap();

        let twin = User {
            user_id: "u2".to_string(),
            ..user.clone()
        };
        assert!(store.insert_user(&twin).await.is_err());
        assert_eq!(store.find_user_by_github_id(42).await.unwrap(), Some(user));
    }
}
