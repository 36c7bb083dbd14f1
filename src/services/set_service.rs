use mongodb::bson::oid::ObjectId;
use serde::Deserialize;

use crate::database::{SetStore, UserStore};
use crate::models::{Category, Set, SetDetail, SetDraft, SetFilter, SetPage, SetSummary, UserInfo};
use crate::services::access_policy::{self, Viewer};
use crate::utils::AppError;

/// Sentinel accepted by the category filter meaning "any category".
pub const ALL_CATEGORIES: &str = "All";

/// Query string of the public browse endpoint.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PublicListParams {
    /// Case-insensitive substring of the set name
    pub query: Option<String>,
    /// Category name, or `All`
    pub category: Option<String>,
    /// Page size, 1 to 200. Unparseable values fall back to 50.
    #[param(value_type = Option<i64>)]
    pub limit: Option<String>,
    /// Rows to skip. Unparseable values fall back to 0.
    #[param(value_type = Option<i64>)]
    pub offset: Option<String>,
}

/// Listing never fails on a bad number; it falls back to the default.
fn lenient_number(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok()).unwrap_or(default)
}

/// Turns raw list parameters into a store filter. `None` means the category
/// names nothing we know, so nothing can match.
pub fn build_filter(params: &PublicListParams) -> Option<SetFilter> {
    let category = match params.category.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) if raw.eq_ignore_ascii_case(ALL_CATEGORIES) => None,
        Some(raw) => Some(raw.parse::<Category>().ok()?),
    };

    let query = params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string);

    Some(SetFilter {
        query,
        category,
        limit: lenient_number(params.limit.as_deref(), SetFilter::DEFAULT_LIMIT)
            .clamp(1, SetFilter::MAX_LIMIT),
        offset: lenient_number(params.offset.as_deref(), 0).max(0),
    })
}

/// Malformed ids are reported as missing sets.
fn parse_set_id(id: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(id).map_err(|_| AppError::set_not_found())
}

pub async fn create_set(
    sets: &dyn SetStore,
    viewer: Option<&Viewer>,
    draft: SetDraft,
) -> Result<Set, AppError> {
    let viewer = match viewer {
        Some(v) if access_policy::can_create(Some(v)) => v,
        _ => return Err(AppError::Unauthenticated),
    };

    draft.validate()?;

    let set = Set::from_draft(&viewer.user_id, draft);
    sets.insert_set(&set).await?;

    log::info!(
        "📝 Set {} created by {} with {} cards",
        set.id.to_hex(),
        viewer.user_id,
        set.cards.len()
    );
    Ok(set)
}

/// Replaces name, description, category, visibility and the full card list.
pub async fn update_set(
    sets: &dyn SetStore,
    viewer: &Viewer,
    id: &str,
    draft: SetDraft,
) -> Result<Set, AppError> {
    draft.validate()?;

    let object_id = parse_set_id(id)?;
    let existing = sets
        .find_set(&object_id)
        .await?
        .ok_or_else(AppError::set_not_found)?;

    if !access_policy::can_write(viewer, &existing) {
        log::warn!("⛔ {} tried to update set {} owned by {}", viewer.user_id, id, existing.user_id);
        return Err(AppError::Unauthorized);
    }

    // Deleted between the check and the write
    let updated = sets
        .replace_set(&object_id, &viewer.user_id, draft)
        .await?
        .ok_or_else(AppError::set_not_found)?;

    log::info!("✏️ Set {} updated ({} cards)", id, updated.cards.len());
    Ok(updated)
}

pub async fn delete_set(sets: &dyn SetStore, viewer: &Viewer, id: &str) -> Result<(), AppError> {
    let object_id = parse_set_id(id)?;
    let existing = sets
        .find_set(&object_id)
        .await?
        .ok_or_else(AppError::set_not_found)?;

    if !access_policy::can_write(viewer, &existing) {
        log::warn!("⛔ {} tried to delete set {} owned by {}", viewer.user_id, id, existing.user_id);
        return Err(AppError::Unauthorized);
    }

    if !sets.delete_set(&object_id, &viewer.user_id).await? {
        return Err(AppError::set_not_found());
    }

    log::info!("🗑️ Set {} deleted by {}", id, viewer.user_id);
    Ok(())
}

pub async fn list_owned_by(sets: &dyn SetStore, viewer: &Viewer) -> Result<Vec<SetSummary>, AppError> {
    sets.list_by_owner(&viewer.user_id).await
}

pub async fn list_public(sets: &dyn SetStore, params: &PublicListParams) -> Result<SetPage, AppError> {
    match build_filter(params) {
        Some(filter) => sets.list_public(&filter).await,
        None => {
            log::debug!("Unknown category filter {:?}", params.category);
            Ok(SetPage::default())
        }
    }
}

/// A private set requested by anyone but its owner is reported exactly like
/// a missing set.
pub async fn get_by_id(
    sets: &dyn SetStore,
    users: &dyn UserStore,
    viewer: Option<&Viewer>,
    id: &str,
) -> Result<SetDetail, AppError> {
    let object_id = parse_set_id(id)?;
    let set = sets
        .find_set(&object_id)
        .await?
        .filter(|set| access_policy::can_read(viewer, set))
        .ok_or_else(AppError::set_not_found)?;

    let owner = match users.find_user(&set.user_id).await? {
        Some(user) => user.info(),
        None => {
            log::warn!("⚠️ Owner {} of set {} not found", set.user_id, id);
            UserInfo::unknown(&set.user_id)
        }
    };

    Ok(SetDetail::new(set, owner))
}
