use std::sync::Arc;

use crate::{
    db::DbPool,
    events::EventSender,
    repositories::{
        SeaOrmCatalogRepository, SeaOrmMachineRepository, SeaOrmModelPartRepository,
        SeaOrmPartReplacementRepository, SeaOrmReadingRepository, SeaOrmSubmissionRepository,
    },
    services::{consumables::ConsumableService, readings::ReadingService},
};

/// Builds services over sea-orm repositories sharing one pool and event queue.
pub struct ServiceFactory {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    import_max_rows: usize,
}

impl ServiceFactory {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, import_max_rows: usize) -> Self {
        Self {
            db_pool,
            event_sender,
            import_max_rows,
        }
    }

    /// Creates a reading service instance
    pub fn reading_service(&self) -> ReadingService {
        ReadingService::new(
            Arc::new(SeaOrmMachineRepository::new(self.db_pool.clone())),
            Arc::new(SeaOrmReadingRepository::new(self.db_pool.clone())),
            Arc::new(SeaOrmSubmissionRepository::new(self.db_pool.clone())),
            self.event_sender.clone(),
            self.import_max_rows,
        )
    }

    /// Creates a consumable service instance
    pub fn consumable_service(&self) -> ConsumableService {
        ConsumableService::new(
            Arc::new(SeaOrmMachineRepository::new(self.db_pool.clone())),
            Arc::new(SeaOrmModelPartRepository::new(self.db_pool.clone())),
            Arc::new(SeaOrmPartReplacementRepository::new(self.db_pool.clone())),
            Arc::new(SeaOrmReadingRepository::new(self.db_pool.clone())),
            Arc::new(SeaOrmCatalogRepository::new(self.db_pool.clone())),
            self.event_sender.clone(),
            self.import_max_rows,
        )
    }

    /// Gets a reference to the database pool
    pub fn db_pool(&self) -> &Arc<DbPool> {
        &self.db_pool
    }
}

/// Service container holding all service instances
#[derive(Clone)]
pub struct ServiceContainer {
    pub readings: Arc<ReadingService>,
    pub consumables: Arc<ConsumableService>,
}

impl ServiceContainer {
    pub fn new(factory: &ServiceFactory) -> Self {
        Self {
            readings: Arc::new(factory.reading_service()),
            consumables: Arc::new(factory.consumable_service()),
        }
    }
}
