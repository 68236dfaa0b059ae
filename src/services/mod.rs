// Pure calculators
pub mod consumable_yield;
pub mod meter_usage;
pub mod reading_validation;

// Orchestration over the repositories
pub mod consumables;
pub mod readings;

// Tabular input and output
pub mod export;
pub mod imports;

// Service factory for dependency injection
pub mod factory;
