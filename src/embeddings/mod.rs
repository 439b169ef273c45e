// Embeddings, vector storage and RAG context retrieval

pub mod indexer;
pub mod memory_store;
pub mod text_chunker;
pub mod vector_store;

pub use indexer::*;
pub use memory_store::InMemoryVectorStore;
pub use text_chunker::*;
pub use vector_store::*;
