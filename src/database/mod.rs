pub mod memory_store;
pub mod mongo_store;
pub mod store;

pub use memory_store::MemoryStore;
pub use mongo_store::MongoStore;
pub use store::{SetStore, UserStore};

use anyhow::Result;
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        let db = client.database(&database_name(uri));

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the indexes used by set listing and user lookup.
    async fn ensure_indexes(&self) -> Result<()> {
        use mongodb::bson::doc;

        log::info!("🔧 Creating database indexes...");

        let users = self.collection::<mongodb::bson::Document>("users");

        let user_id_index = IndexModel::builder()
            .keys(doc! { "user_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        match users.create_index(user_id_index).await {
            Ok(_) => log::info!("   ✅ Index created: users(user_id)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        // Sparse: dev-login accounts carry no github_id
        let github_index = IndexModel::builder()
            .keys(doc! { "github_id": 1 })
            .options(IndexOptions::builder().unique(true).sparse(true).build())
            .build();

        match users.create_index(github_index).await {
            Ok(_) => log::info!("   ✅ Index created: users(github_id)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        let sets = self.collection::<mongodb::bson::Document>("sets");

        let owner_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "updated_at": -1 })
            .build();

        match sets.create_index(owner_index).await {
            Ok(_) => log::info!("   ✅ Index created: sets(user_id, updated_at)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        let browse_index = IndexModel::builder()
            .keys(doc! { "visibility": 1, "category": 1, "updated_at": -1 })
            .build();

        match sets.create_index(browse_index).await {
            Ok(_) => log::info!("   ✅ Index created: sets(visibility, category, updated_at)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub async fn health_check(&self) -> Result<bool> {
        self.db.list_collection_names().await?;
        Ok(true)
    }
}

/// Database name from the last path segment of the URI.
fn database_name(uri: &str) -> String {
    let without_scheme = uri.split_once("://").map(|(_, rest)| rest).unwrap_or(uri);
    without_scheme
        .split_once('/')
        .map(|(_, path)| path.split('?').next().unwrap_or(""))
        .filter(|name| !name.is_empty())
        .unwrap_or("flashcards")
        .to_string()
}
