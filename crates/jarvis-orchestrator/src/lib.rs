//! The Jarvis Orchestrator: agent selection, per-run budgets, sync/async
//! dispatch under a deadline, RBAC-scoped reads, and the agent-handler
//! registry, wired on top of `jarvis-model`'s run/node arena,
//! `jarvis-access`'s authorization and tenant limiter, `jarvis-llm`'s
//! facade, `jarvis-browser`'s session manager and action engine, and
//! `jarvis-queue`'s bridge.

pub mod agent_handler;
pub mod agent_handlers;
pub mod agent_selection;
pub mod browser_planner;
pub mod idempotency;
pub mod orchestrator;
pub mod queue_worker;
pub mod reaper;
pub mod request;
pub mod run_store;
pub mod shutdown;

pub use agent_handler::{AgentHandler, BudgetLimits, HandlerContext};
pub use agent_handlers::{BrowserHandler, EchoHandler, GenHandler};
pub use idempotency::{IdempotencyStore, InMemoryIdempotencyStore};
pub use orchestrator::{LogPage, Orchestrator, OrchestratorBuilder, OrchestratorConfig, RunAdmission};
pub use queue_worker::run_queue_worker;
pub use reaper::spawn_idle_reaper;
pub use request::{BrowserStepSpec, RunInput, RunOptions};
pub use run_store::RunStore;
pub use shutdown::{run_until_shutdown, ShutdownCoordinator};
