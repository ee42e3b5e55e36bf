mod error;
mod memory;
mod traits;

pub use error::StoreError;
pub use memory::InMemoryRecordStore;
pub use traits::RecordStore;
