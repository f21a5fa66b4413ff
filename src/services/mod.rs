//! Environmental data, text generation, and the tool channel between them.

pub mod client;
pub mod fetch;
pub mod genai;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod tools;

pub use client::StdioToolClient;
pub use fetch::{EnvironmentSource, HttpSource, Location};
pub use genai::{GeminiClient, GenerateError, TextGenerator};
pub use server::ToolServer;
pub use tools::{LocalTools, ToolBackend, ToolError};
