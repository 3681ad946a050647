//! Database-backed persistence. Pools are created in `main.rs`; modules here take a `&PgPool`.

pub mod payloads;
