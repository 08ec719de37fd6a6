// Infrastructure layer - Configuration and external adapters
pub mod config;
pub mod gemini_generator;
