pub mod chroma;
pub mod embedding;
pub mod index;
pub mod search;

pub use chroma::{ChromaConfig, ChromaIndex, DEFAULT_CHROMA_URL};
pub use embedding::{Embedder, OpenAIEmbedder, DEFAULT_EMBEDDING_MODEL};
pub use index::{DocFilter, InMemoryIndex, Passage, PassageMetadata, SimilarityIndex, UNKNOWN_FILE};
pub use search::{SearchHit, SerpApiSearch, WebSearch};
