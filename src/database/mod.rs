pub mod manager;
pub mod memory;
pub mod models;
pub mod repository;
pub mod store;

pub use manager::DatabaseManager;
pub use memory::MemoryStore;
pub use repository::PgRepository;
pub use store::{constraints, PurchaseRequestFilter, Store, StoreError};
