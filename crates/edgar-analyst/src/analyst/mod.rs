//! AI analyst: report contracts, prompt templates and the provider chain

pub mod context;
pub mod json;
pub mod orchestrator;
pub mod prompts;
pub mod report;
pub mod strategy;

pub use context::AnalysisContext;
pub use orchestrator::{AnalystOrchestrator, LocalLlmResult, Orchestrated, ProviderSelection};
pub use report::{AnalysisReport, FilingAnalysis, ReportSchema};
pub use strategy::{
    CloudLlmStrategy, LocalLlmStrategy, ProviderFailure, ProviderKind, ProviderStrategy,
    RuleBasedStrategy,
};
