//! SQLite-Backend des Verzeichnisses

pub mod pool;
pub mod verzeichnis;

pub use pool::SqliteVerzeichnis;
