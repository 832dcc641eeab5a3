//! Agent System
//!
//! The agents that drive a single research run. Each one wraps one prompt
//! against the text-generation port and owns its own fallback, so no agent
//! failure ever aborts the workflow.
//!
//! - **Query Agent**: turns the topic into the first web search query
//! - **Summarizer Agent**: writes, then extends, the running summary
//! - **Reflection Agent**: names the knowledge gap and the next query
//!
//! ## Pipeline Overview
//!
//! ```text
//!  Research Topic
//!      │
//!      ▼
//! ┌─────────────┐
//! │   Query     │  → Initial search query
//! │   Agent     │
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │    Web      │  → Formatted sources + citations   ◄──┐
//! │  Research   │                                        │
//! └─────────────┘                                        │
//!      │                                                 │
//!      ▼                                                 │
//! ┌─────────────┐                                        │
//! │ Summarizer  │  → New or extended summary             │
//! │   Agent     │                                        │
//! └─────────────┘                                        │
//!      │                                                 │
//!      ▼                                                 │
//! ┌─────────────┐   loop_count < max_web_research_loops  │
//! │ Reflection  │  ──────────────────────────────────────┘
//! │   Agent     │
//! └─────────────┘
//!      │ otherwise
//!      ▼
//!  Final summary with sources
//! ```

pub mod parse;
pub mod prompts;
pub mod query;
pub mod reflection;
pub mod state;
pub mod summarizer;
pub mod workflow;

pub use parse::Parsed;
pub use query::QueryAgent;
pub use reflection::ReflectionAgent;
pub use state::ResearchState;
pub use summarizer::SummarizerAgent;
pub use workflow::{
    finalize_summary, route_research, ResearchRun, ResearchRunner, ResearchWorkflow,
    WorkflowSettings, WorkflowStep, NO_RESULTS_TEXT, NO_SOURCES_TEXT,
};
