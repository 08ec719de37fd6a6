// Application layer - Use cases and the text generation port
pub mod analysis_service;
pub mod explanation_service;
pub mod prompts;
pub mod text_generator;
