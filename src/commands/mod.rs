pub mod backup;
pub mod dashboard;
pub mod gas;
pub mod records;
pub mod settings;
