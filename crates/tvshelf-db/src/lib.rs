//! tvshelf-db: database schema, migrations, and query operations.
//!
//! SQLite via rusqlite with r2d2 connection pooling.
//!
//! # Modules
//!
//! - `migrations` - Embedded schema migrations
//! - `pool` - Connection pool management
//! - `models` - Rust models matching the schema
//! - `queries` - Query operations, one module per table
//!
//! # Example
//!
//! ```
//! use tvshelf_db::pool::{init_memory_pool, get_conn};
//! use tvshelf_db::queries::shows;
//!
//! let pool = init_memory_pool().unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! let show = shows::create_show(&conn, "Firefly", Some("Firefly (2002)"), Some(2002)).unwrap();
//! assert_eq!(show.title, "Firefly");
//! ```

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
