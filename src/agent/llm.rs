//! The LLM provider collaborator (§6): produces one conversational turn at a
//! time, either a tool call or a final answer. The multi-turn loop itself
//! lives in `agent::AgentLoop`, mirroring the teacher's own `run_task` ReAct
//! loop (`core/runner.rs`), which drives the turn-taking rather than
//! handing a callback into the provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One entry in the running conversation, appended after every tool call
/// and its result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: TranscriptRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptRole {
    ToolCall,
    ToolResult,
    Thought,
}

/// What the model did on one turn.
#[derive(Debug, Clone)]
pub enum LlmTurn {
    ToolCall { name: String, arguments: serde_json::Value },
    FinalText(String),
}

/// `runConversation` from §6, decomposed into single steps so the core can
/// interleave tool execution between turns (the core "supplies the tools
/// ... and consumes the tool-call events", not the provider).
#[async_trait]
pub trait LlmRuntime: Send + Sync {
    /// Produce the next turn given the full conversation so far.
    /// `Err` represents an LLM transport failure (§4.6): the agent loop
    /// aborts the current iteration and proceeds to the next one.
    async fn next_turn(
        &self,
        system_prompt: &str,
        user_message: &str,
        tool_defs: &serde_json::Value,
        transcript: &[TranscriptEntry],
    ) -> Result<LlmTurn, String>;
}
