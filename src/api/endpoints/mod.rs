//! HTTP endpoint handlers. Each one is a thin adapter over `pipeline`.

pub mod crops;
pub mod disease;
pub mod health;
