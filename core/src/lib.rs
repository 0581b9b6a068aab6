pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod scorer;
pub mod shared;
pub mod shingle;
pub mod stream;
pub mod tokenizer;

pub use config::IndexConfig;
pub use document::{Document, Item};
pub use error::{Error, Result};
pub use index::{Index, InvertedIndex, Posting};
pub use shared::SharedIndex;
pub use shingle::ShingleSet;
pub use stream::{SearchResult, SimilarStream};
pub use tokenizer::{tokenize, Token, Tokenizer};
