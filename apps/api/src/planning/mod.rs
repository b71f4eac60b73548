pub mod extract;
pub mod generator;
pub mod handlers;
pub mod normalizer;
pub mod prompts;
pub mod repair;
pub mod request;
pub mod sections;
