//! Episodic memory surface: durable user/assistant exchange records with
//! content-hash dedup, backing the sidebar's learning panel.

pub mod service;
pub mod store;

pub use service::{EpisodicMemoryService, EpisodicSystemStatus, ExtractReport};
pub use store::EpisodicStore;
