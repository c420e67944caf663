//! Service layer module
//!
//! Contains the tokenizer, model gateway, estimation engine and session orchestrator

pub mod estimator;
pub mod gateway;
pub mod orchestrator;
pub mod tokenizer;

pub use estimator::Estimator;
pub use gateway::{invoke_all, Gateway, ModelGateway};
pub use orchestrator::{Orchestrator, Phase, Pipeline, Snapshot};
pub use tokenizer::{
    fallback_estimate, LocalTokenizer, RemoteTokenizer, TokenCounter, TokenizerCell, TokenizerService, TokenizerState,
};
