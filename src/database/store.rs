use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use crate::models::{Set, SetDraft, SetFilter, SetPage, SetSummary, User};
use crate::utils::AppError;

/// Persistence contract for sets and their cards.
///
/// Implementations must apply every mutation as one unit: a reader never
/// observes a set without cards, and a failed write leaves the previous
/// state in place.
#[async_trait]
pub trait SetStore: Send + Sync {
    /// Inserts a set together with all of its cards.
    async fn insert_set(&self, set: &Set) -> Result<(), AppError>;

    async fn find_set(&self, id: &ObjectId) -> Result<Option<Set>, AppError>;

    /// Overwrites the content of the set `id` owned by `user_id` and replaces
    /// its whole card list with freshly minted cards from `draft`.
    ///
    /// Returns `None` when no set matches both `id` and `user_id`.
    async fn replace_set(
        &self,
        id: &ObjectId,
        user_id: &str,
        draft: SetDraft,
    ) -> Result<Option<Set>, AppError>;

    /// Removes the set and its cards. Returns whether a set was removed.
    async fn delete_set(&self, id: &ObjectId, user_id: &str) -> Result<bool, AppError>;

    /// Every set of `user_id`, most recently updated first.
    async fn list_by_owner(&self, user_id: &str) -> Result<Vec<SetSummary>, AppError>;

    /// Page of `PUBLIC` sets matching `filter`, most recently updated first,
    /// with the number of matches before pagination.
    async fn list_public(&self, filter: &SetFilter) -> Result<SetPage, AppError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, user_id: &str) -> Result<Option<User>, AppError>;

    async fn find_user_by_github_id(&self, github_id: i64) -> Result<Option<User>, AppError>;

    async fn insert_user(&self, user: &User) -> Result<(), AppError>;
}
