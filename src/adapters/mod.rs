// Adapters layer: concrete implementations of the domain ports.

#[cfg(test)]
pub mod memory;
pub mod storage;

#[cfg(test)]
pub use memory::MemoryStorage;
pub use storage::LocalStorage;
