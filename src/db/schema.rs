//! SQL DDL for initializing the catalog storage.
//! SQLite-first design; statements are idempotent and run at every boot.

/// SQLite schema with:
/// - `category` / `product`: `id` INTEGER PRIMARY KEY AUTOINCREMENT, `name` UNIQUE
/// - `product_category`: join rows keyed by the (product, category) pair,
///   cascading on delete of either side
/// - `users`: unique `login`, argon2 PHC string in `password_hash`
/// - `session`: `token` PRIMARY KEY, `expires_at` as unix milliseconds
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS category (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS product (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS product_category (
    product_id INTEGER NOT NULL REFERENCES product(id) ON DELETE CASCADE,
    category_id INTEGER NOT NULL REFERENCES category(id) ON DELETE CASCADE,
    PRIMARY KEY (product_id, category_id)
);

CREATE INDEX IF NOT EXISTS idx_product_category_category_id ON product_category(category_id);

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    login TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS session (
    token TEXT PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    expires_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_session_expires_at ON session(expires_at);
"#;
