//! Test harness - isolated database management


pub use db_manager::TestDatabaseManager;
