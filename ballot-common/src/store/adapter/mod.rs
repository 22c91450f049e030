//! Define a generic way to store data with the [Store Adapter][store_adapter::StoreAdapter], with
//! two implementations: [in memory][MemoryAdapter] and [filesystem as json][JsonFileStoreAdapter].

mod jsonfile_store_adapter;
mod memory_adapter;
mod store_adapter;

pub use jsonfile_store_adapter::JsonFileStoreAdapter;
pub use memory_adapter::MemoryAdapter;
pub use store_adapter::*;
