/// 启动恢复
///
/// Rebuilds every symbol's engine from the shared event log, optionally
/// starting from checkpoints. The log is always read from the start so a
/// symbol without a checkpoint is never missed; events a checkpoint already
/// covers are skipped instead of applied.
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::context::EngineContext;
use super::matching_engine::{EngineSnapshot, MatchingEngine};
use crate::application::error::EngineError;
use crate::domain::events::LogEntry;

pub(crate) fn rebuild_engines(
    ctx: &EngineContext,
    snapshots: Vec<EngineSnapshot>,
) -> Result<HashMap<String, MatchingEngine>, EngineError> {
    let mut engines: HashMap<String, MatchingEngine> = HashMap::new();
    for snapshot in snapshots {
        let symbol = snapshot.symbol.clone();
        let engine = MatchingEngine::from_snapshot(snapshot, ctx.clone())?;
        if engines.insert(symbol.clone(), engine).is_some() {
            return Err(EngineError::replay(format!("two snapshots for {}", symbol)));
        }
    }

    let log = Arc::clone(&ctx.log);
    let mut applied = 0usize;
    for entry in log.read_from(0)? {
        let LogEntry { position, event } = entry?;
        let engine = engines
            .entry(event.symbol().to_string())
            .or_insert_with(|| MatchingEngine::new(event.symbol(), ctx.clone()));
        if position < engine.log_position() {
            continue;
        }
        engine
            .apply(&event, position)
            .map_err(|e| e.at_position(position))?;
        applied += 1;
    }

    for engine in engines.values() {
        engine.refresh_gauges();
    }
    info!(
        "rebuilt {} symbols from event log ({} events applied, next order id {})",
        engines.len(),
        applied,
        ctx.ids.peek()
    );
    Ok(engines)
}
