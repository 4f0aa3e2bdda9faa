//! Database layer for the persona platform.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! embedded SQL migrations and the persona record queries. The avatar
//! manifest and chunk tables are created here as well; their read and write
//! paths live in `persona-avatar`.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: concurrent readers with a single writer, which
//!   matches the read-heavy avatar fan-out.
//! - **`r2d2` connection pool**: one pool is built at startup and handed to
//!   every component that needs storage.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!`.

mod migrations;
pub mod personas;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use personas::{
    delete_persona, get_persona, list_personas, upsert_persona, PersonaDbError, PersonaUpsert,
};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
