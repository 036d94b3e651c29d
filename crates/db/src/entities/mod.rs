//! `SeaORM` entity definitions.

pub mod extensions;
