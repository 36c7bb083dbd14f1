use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::options::ReturnDocument;
use serde::Deserialize;

use crate::database::{MongoDB, SetStore, UserStore};
use crate::models::{Category, CardDraft, Set, SetDraft, SetFilter, SetPage, SetSummary, User, Visibility};
use crate::utils::AppError;

const SETS: &str = "sets";
const USERS: &str = "users";

/// MongoDB-backed store. Cards are embedded in the set document, so every
/// set mutation is a single-document write and therefore atomic.
#[derive(Clone)]
pub struct MongoStore {
    db: MongoDB,
}

impl MongoStore {
    pub fn new(db: MongoDB) -> Self {
        Self { db }
    }

    async fn summaries(&self, pipeline: Vec<Document>) -> Result<Vec<SetSummary>, AppError> {
        let cursor = self.db.collection::<Document>(SETS).aggregate(pipeline).await?;
        let docs: Vec<Document> = cursor.try_collect().await?;

        docs.into_iter()
            .map(|d| {
                mongodb::bson::from_document::<SummaryDoc>(d)
                    .map(SummaryDoc::into_summary)
                    .map_err(|e| AppError::Database(format!("Malformed set document: {}", e)))
            })
            .collect()
    }
}

/// Projection of a set document with the card count computed server-side.
#[derive(Debug, Deserialize)]
struct SummaryDoc {
    #[serde(rename = "_id")]
    id: ObjectId,
    user_id: String,
    name: String,
    description: String,
    #[serde(default)]
    category: Option<Category>,
    #[serde(default)]
    visibility: Visibility,
    card_count: i64,
    created_at: i64,
    updated_at: i64,
}

impl SummaryDoc {
    fn into_summary(self) -> SetSummary {
        SetSummary {
            id: self.id.to_hex(),
            user_id: self.user_id,
            name: self.name,
            description: self.description,
            category: self.category,
            visibility: self.visibility,
            card_count: self.card_count.max(0) as u64,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn summary_stages(offset: i64, limit: Option<i64>) -> Vec<Document> {
    let mut stages = vec![doc! { "$sort": { "updated_at": -1, "_id": -1 } }];
    if offset > 0 {
        stages.push(doc! { "$skip": offset });
    }
    if let Some(limit) = limit {
        stages.push(doc! { "$limit": limit });
    }
    stages.push(doc! {
        "$project": {
            "user_id": 1,
            "name": 1,
            "description": 1,
            "category": 1,
            "visibility": 1,
            "created_at": 1,
            "updated_at": 1,
            "card_count": { "$size": "$cards" },
        }
    });
    stages
}

/// Escapes regex metacharacters so a search query matches literally.
fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn public_filter(filter: &SetFilter) -> Result<Document, AppError> {
    let mut query = doc! { "visibility": mongodb::bson::to_bson(&Visibility::Public)? };

    if let Some(text) = &filter.query {
        query.insert(
            "name",
            doc! { "$regex": escape_regex(text), "$options": "i" },
        );
    }
    if let Some(category) = filter.category {
        query.insert("category", category.as_str());
    }

    Ok(query)
}

#[async_trait]
impl SetStore for MongoStore {
    async fn insert_set(&self, set: &Set) -> Result<(), AppError> {
        self.db.collection::<Set>(SETS).insert_one(set).await?;
        Ok(())
    }

    async fn find_set(&self, id: &ObjectId) -> Result<Option<Set>, AppError> {
        Ok(self
            .db
            .collection::<Set>(SETS)
            .find_one(doc! { "_id": *id })
            .await?)
    }

    async fn replace_set(
        &self,
        id: &ObjectId,
        user_id: &str,
        draft: SetDraft,
    ) -> Result<Option<Set>, AppError> {
        let cards: Vec<_> = draft.cards.into_iter().map(CardDraft::into_card).collect();

        let update = doc! {
            "$set": {
                "name": draft.name,
                "description": draft.description,
                "category": mongodb::bson::to_bson(&draft.category)?,
                "visibility": mongodb::bson::to_bson(&draft.visibility)?,
                "cards": mongodb::bson::to_bson(&cards)?,
                "updated_at": chrono::Utc::now().timestamp(),
            }
        };

        Ok(self
            .db
            .collection::<Set>(SETS)
            .find_one_and_update(doc! { "_id": *id, "user_id": user_id }, update)
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn delete_set(&self, id: &ObjectId, user_id: &str) -> Result<bool, AppError> {
        let result = self
            .db
            .collection::<Set>(SETS)
            .delete_one(doc! { "_id": *id, "user_id": user_id })
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn list_by_owner(&self, user_id: &str) -> Result<Vec<SetSummary>, AppError> {
        let mut pipeline = vec![doc! { "$match": { "user_id": user_id } }];
        pipeline.extend(summary_stages(0, None));
        self.summaries(pipeline).await
    }

    async fn list_public(&self, filter: &SetFilter) -> Result<SetPage, AppError> {
        let query = public_filter(filter)?;
        let total = self
            .db
            .collection::<Document>(SETS)
            .count_documents(query.clone())
            .await?;

        let mut pipeline = vec![doc! { "$match": query }];
        pipeline.extend(summary_stages(filter.offset, Some(filter.limit)));
        Ok(SetPage {
            sets: self.summaries(pipeline).await?,
            total,
        })
    }
}

#[async_trait]
impl UserStore for MongoStore {
    async fn find_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .db
            .collection::<User>(USERS)
            .find_one(doc! { "user_id": user_id })
            .await?)
    }

    async fn find_user_by_github_id(&self, github_id: i64) -> Result<Option<User>, AppError> {
        Ok(self
            .db
            .collection::<User>(USERS)
            .find_one(doc! { "github_id": github_id })
            .await?)
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        self.db.collection::<User>(USERS).insert_one(user).await?;
        Ok(())
    }
}
