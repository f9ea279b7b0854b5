pub mod prompts;
pub mod settings;
pub mod versions;
