pub mod writer;

pub use writer::{WriterClient, WriterConfig};
