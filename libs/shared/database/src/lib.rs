pub mod catalog;
pub mod doctors;
pub mod error;
pub mod medications;
pub mod patients;
pub mod sqlite;

pub use error::DatabaseError;
pub use sqlite::Database;
