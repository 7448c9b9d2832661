use crate::auth::repo::UserRepo;
use crate::config::AppConfig;
use crate::mockups::MockupRegistry;
use crate::orders::repo::OrderRepo;
use crate::payments::{PaymentGateway, StripeGateway};
use crate::products::repo::ProductRepo;
use crate::storage::{S3Storage, StorageClient};
use crate::store::PgStore;
use crate::uploads::repo::UploadRepo;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub products: Arc<dyn ProductRepo>,
    pub uploads: Arc<dyn UploadRepo>,
    pub orders: Arc<dyn OrderRepo>,
    pub storage: Arc<dyn StorageClient>,
    pub payments: Arc<dyn PaymentGateway>,
    pub mockups: Arc<MockupRegistry>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let store = Arc::new(PgStore::connect(&config.database_url).await?);
        store.migrate().await;

        // Real S3/MinIO
        let storage = Arc::new(S3Storage::new(&config.storage).await?) as Arc<dyn StorageClient>;
        let payments = Arc::new(StripeGateway::new(&config.stripe)?) as Arc<dyn PaymentGateway>;
        let mockups = Arc::new(MockupRegistry::from_config(&config.mockups)?);
        tracing::info!(vendors = ?mockups.vendors(), "mockup vendors configured");

        Ok(Self {
            config: Arc::new(config),
            users: store.clone(),
            products: store.clone(),
            uploads: store.clone(),
            orders: store,
            storage,
            payments,
            mockups,
        })
    }
}
