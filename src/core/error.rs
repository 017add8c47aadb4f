//! Error types for the mesh draw cache

use thiserror::Error;

/// Main error type for extraction and cache management
#[derive(Debug, Error)]
pub enum Error {
    #[error("GPU allocation failed for {buffer}: requested {requested} bytes, {available} available")]
    Allocation {
        buffer: &'static str,
        requested: usize,
        available: usize,
    },

    #[error("Vertex format error: {0}")]
    Format(String),

    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Task graph error: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
