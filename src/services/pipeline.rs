use std::time::Duration;

use log::{debug, info, warn};
use uuid::Uuid;

use crate::models::conversation::ConversationTurn;
use crate::models::query::{Intent, Query};
use crate::models::response::{ErrorKind, ResponseState};
use crate::services::analytical::AnalyticalHandler;
use crate::services::conversational::ConversationalHandler;
use crate::services::insight::InsightGenerator;
use crate::services::router::IntentRouter;
use crate::services::semantic::SemanticHandler;
use crate::services::tools::ToolHandler;
use crate::services::visualization::VisualizationSelector;
use crate::services::{
    AiServiceTrait, HandlerOutput, MemoryServiceTrait, SqlServiceTrait, VectorServiceTrait,
};

/// Pipeline stages, strictly sequential with no branching back.
/// Failure never skips a stage: a degraded query still flows through
/// `Memorized` to `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Received,
    Routed,
    Handled,
    Visualized,
    Annotated,
    Memorized,
    Done,
}

impl Stage {
    fn name(&self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Routed => "routed",
            Stage::Handled => "handled",
            Stage::Visualized => "visualized",
            Stage::Annotated => "annotated",
            Stage::Memorized => "memorized",
            Stage::Done => "done",
        }
    }
}

/// The query pipeline: routes a query to one handler, attaches a
/// visualization recommendation and insights, and assembles exactly
/// one `ResponseState` per query.
#[derive(Clone, Debug)]
pub struct QueryPipeline<A, S, V, M>
where
    A: AiServiceTrait + Clone + std::fmt::Debug,
    S: SqlServiceTrait + Clone + std::fmt::Debug,
    V: VectorServiceTrait + Clone + std::fmt::Debug,
    M: MemoryServiceTrait + Clone + std::fmt::Debug,
{
    router: IntentRouter<A>,
    analytical: AnalyticalHandler<A, S, M>,
    semantic: SemanticHandler<A, S, V, M>,
    tools: ToolHandler<A>,
    conversational: ConversationalHandler<A, M>,
    selector: VisualizationSelector<A>,
    insights: InsightGenerator<A>,
    memory_service: M,
    timeout: Duration,
}

impl<A, S, V, M> QueryPipeline<A, S, V, M>
where
    A: AiServiceTrait + Clone + std::fmt::Debug,
    S: SqlServiceTrait + Clone + std::fmt::Debug,
    V: VectorServiceTrait + Clone + std::fmt::Debug,
    M: MemoryServiceTrait + Clone + std::fmt::Debug,
{
    pub fn new(
        ai_service: A,
        sql_service: S,
        vector_service: V,
        memory_service: M,
        top_k: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            router: IntentRouter::new(ai_service.clone()),
            analytical: AnalyticalHandler::new(
                ai_service.clone(),
                sql_service.clone(),
                memory_service.clone(),
            ),
            semantic: SemanticHandler::new(
                ai_service.clone(),
                sql_service,
                vector_service,
                memory_service.clone(),
                top_k,
            ),
            tools: ToolHandler::new(ai_service.clone()),
            conversational: ConversationalHandler::new(ai_service.clone(), memory_service.clone()),
            selector: VisualizationSelector::new(ai_service.clone()),
            insights: InsightGenerator::new(ai_service),
            memory_service,
            timeout,
        }
    }

    /// Run one query through the pipeline. Always returns exactly one
    /// `ResponseState`; any failure along the way degrades the state
    /// instead of aborting it.
    pub async fn run(&self, query: Query) -> ResponseState {
        let request_id = Uuid::new_v4();
        self.log_stage(request_id, Stage::Received);

        let state = match tokio::time::timeout(self.timeout, self.run_stages(request_id, &query)).await
        {
            Ok(state) => state,
            Err(_) => {
                warn!(
                    "[Query-{}] Timed out after {:?}, cancelling in-flight work",
                    request_id, self.timeout
                );
                timeout_state(&query)
            }
        };

        // Memorization runs even for degraded and timed-out states.
        self.memorize(request_id, &query, &state).await;
        self.log_stage(request_id, Stage::Done);
        state
    }

    async fn run_stages(&self, request_id: Uuid, query: &Query) -> ResponseState {
        let intent = self.router.classify(query).await;
        self.log_stage(request_id, Stage::Routed);

        let output: HandlerOutput = match intent {
            Intent::Analytical => self.analytical.handle(query).await,
            Intent::Semantic => self.semantic.handle(query).await,
            Intent::Tool => self.tools.handle(query).await,
            Intent::Conversational => self.conversational.handle(query).await,
        };
        self.log_stage(request_id, Stage::Handled);

        // Tool and conversational answers are text-only: no chart.
        let visualization_config = match intent {
            Intent::Tool | Intent::Conversational => None,
            _ => self.selector.select(&output.results, &query.raw_text).await,
        };
        self.log_stage(request_id, Stage::Visualized);

        let insights = match intent {
            Intent::Tool | Intent::Conversational => None,
            _ => self.insights.generate(&output.results, &query.raw_text).await,
        };
        self.log_stage(request_id, Stage::Annotated);

        ResponseState {
            query: query.raw_text.clone(),
            intent,
            sql_query: output.sql_query,
            results: output.results,
            visualization_config,
            insights,
            message: output.message,
            error: output.error,
        }
    }

    /// Append the user turn and an assistant summary to conversation
    /// memory. Memory failures are logged and swallowed, never
    /// surfaced to the caller.
    async fn memorize(&self, request_id: Uuid, query: &Query, state: &ResponseState) {
        let user_turn = ConversationTurn::user(&query.raw_text);
        if let Err(e) = self.memory_service.append(&query.conversation_id, user_turn).await {
            warn!("[Query-{}] Failed to memorize user turn: {}", request_id, e);
        }

        let summary = if state.results.is_empty() {
            state.message.clone()
        } else {
            format!("{} ({} rows returned)", state.message, state.results.len())
        };
        let assistant_turn = ConversationTurn::assistant(summary);
        if let Err(e) = self
            .memory_service
            .append(&query.conversation_id, assistant_turn)
            .await
        {
            warn!("[Query-{}] Failed to memorize assistant turn: {}", request_id, e);
        }

        self.log_stage(request_id, Stage::Memorized);
    }

    fn log_stage(&self, request_id: Uuid, stage: Stage) {
        if stage == Stage::Done {
            info!("[Query-{}] Pipeline complete", request_id);
        } else {
            debug!("[Query-{}] Stage: {}", request_id, stage.name());
        }
    }
}

/// The distinct "took too long" state, as opposed to "failed".
fn timeout_state(query: &Query) -> ResponseState {
    ResponseState {
        query: query.raw_text.clone(),
        intent: Intent::Conversational,
        sql_query: None,
        results: Vec::new(),
        visualization_config: None,
        insights: None,
        message: "Your request took too long to process and was cancelled. Please try again or simplify the question.".to_string(),
        error: Some(ErrorKind::Timeout),
    }
}
