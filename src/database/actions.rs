//! Postgres queries. Every function takes the pool (or a transaction's
//! connection) explicitly and scopes reads and writes by owner.

pub mod attributes;
pub mod recipes;
pub mod users;
