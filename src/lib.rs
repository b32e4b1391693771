pub mod config;
pub mod image_processing;
pub mod locale;
pub mod mcp_server;
pub mod openai;
pub mod resources;
pub mod storage;
pub mod tools;
