pub mod file;
pub mod memory;

pub use self::file::FileSink;
pub use self::memory::MemorySink;
