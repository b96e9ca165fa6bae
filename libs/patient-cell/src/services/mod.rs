pub mod patient;
pub mod reconciliation;

pub use patient::PatientService;
pub use reconciliation::ReconciliationService;
