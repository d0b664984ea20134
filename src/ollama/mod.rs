//! Ollama HTTP access

pub mod client;

pub use client::{Generation, OllamaClient, DEFAULT_OLLAMA_URL};
