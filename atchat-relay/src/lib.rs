pub mod config;
pub mod gemini;
pub mod server;

pub use config::RelayArgs;
pub use gemini::{GeminiClient, GenerateError, Generator};
pub use server::{ERROR_REPLY, RelayState, router, serve};
