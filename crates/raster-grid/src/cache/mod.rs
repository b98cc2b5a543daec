//! Caching for lazily decoded raster tiles.

mod chunk_cache;

pub use chunk_cache::{ChunkCache, ChunkKey};
