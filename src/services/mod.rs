pub mod backup;
pub mod csv_export;
pub mod gas;
pub mod ledger;
pub mod migrator;
pub mod restore;
pub mod state;
pub mod summary;
pub mod validator;
