pub mod memory;
pub mod object;
pub mod records;
pub mod writer;

pub use memory::{MemoryObjectStore, MemoryRecordStore};
pub use object::{FsObjectStore, ObjectStore};
pub use records::{PutOutcome, RecordStore, SqliteRecordStore};
pub use writer::{write_records, WriteSummary};
