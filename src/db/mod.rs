pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::InMemoryStore;
pub use postgres::{create_pool, run_migrations, PgConsensusStore};
pub use store::ConsensusStore;

#[cfg(test)]
pub use store::MockConsensusStore;
