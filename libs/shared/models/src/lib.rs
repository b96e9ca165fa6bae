pub mod catalog;
pub mod doctor;
pub mod error;
pub mod medication;
pub mod patient;
