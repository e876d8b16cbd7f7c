//! Reading records from files.

mod parser;
mod source;

pub use parser::{Parser, ParserConfig};
pub use source::{InputFormat, SourceMetadata};
