//! Persistence collaborators of the service layer.
//!
//! Each repository is an async trait so services can be built over the
//! sea-orm implementations in production and over fakes or mocks in tests.

use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub mod catalog_repository;
pub mod machine_repository;
pub mod model_part_repository;
pub mod part_replacement_repository;
pub mod reading_repository;
pub mod submission_repository;

pub use catalog_repository::{CatalogRepository, SeaOrmCatalogRepository};
pub use machine_repository::{MachineRepository, SeaOrmMachineRepository};
pub use model_part_repository::{ModelPartRepository, SeaOrmModelPartRepository};
pub use part_replacement_repository::{PartReplacementRepository, SeaOrmPartReplacementRepository};
pub use reading_repository::{NewReading, ReadingRepository, SeaOrmReadingRepository};
pub use submission_repository::{SeaOrmSubmissionRepository, SubmissionRepository};

#[cfg(test)]
pub use catalog_repository::MockCatalogRepository;
#[cfg(test)]
pub use machine_repository::MockMachineRepository;
#[cfg(test)]
pub use model_part_repository::MockModelPartRepository;
#[cfg(test)]
pub use part_replacement_repository::MockPartReplacementRepository;
#[cfg(test)]
pub use reading_repository::MockReadingRepository;
#[cfg(test)]
pub use submission_repository::MockSubmissionRepository;

/// Repository trait for common database operations
pub trait Repository {
    fn get_db(&self) -> &DatabaseConnection;
}

#[derive(Debug, Clone)]
pub struct BaseRepository {
    db: Arc<DatabaseConnection>,
}

impl BaseRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl Repository for BaseRepository {
    fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}
