//! Database module: storage traits, models and their SQLite implementation.
//!
//! Layout:
//! - `storage.rs`: capability traits consumed by the services
//! - `models.rs`: Rust structs mirroring DB rows and feed records
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: pool setup and constraint-error classification
//! - `product.rs`, `category.rs`, `session.rs`, `user.rs`: SQLite stores
//! - `memory.rs`: in-memory fake of every trait

pub mod category;
pub mod memory;
pub mod models;
pub mod product;
pub mod schema;
pub mod session;
pub mod sqlite;
pub mod storage;
pub mod user;

pub use category::SqliteCategories;
pub use memory::MemoryStorage;
pub use models::{Category, FeedProduct, NewUser, Product, Session, User};
pub use product::SqliteProducts;
pub use schema::SQLITE_INIT;
pub use session::SqliteSessions;
pub use sqlite::SqlitePool;
pub use storage::{CategoryStorage, ProductStorage, SessionStorage, UserStorage};
pub use user::SqliteUsers;
