pub mod catalog;
pub mod lifecycle;
pub mod medication;

pub use catalog::CatalogService;
pub use lifecycle::MedicationLifecycleService;
pub use medication::MedicationService;
