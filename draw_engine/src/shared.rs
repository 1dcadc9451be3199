//! Shared draw registry for concurrent callers.
//!
//! The engine itself is synchronous and single-writer per draw. The registry
//! keeps each draw behind its own async mutex so that calls against one draw
//! are serialized while different draws proceed independently.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::engine::{DrawEngine, MatchUpOutcome, SetMatchUpStatusParams};
use crate::matchups::MatchUpView;
use crate::model::{DrawDefinition, DrawError, DrawPosition, DrawResult, ParticipantId};
use crate::positions::AssignmentInput;
use crate::round_robin::{GroupTally, PlayoffPlacement};

type DrawHandle = Arc<Mutex<DrawDefinition>>;

/// Draws keyed by drawId
#[derive(Clone)]
pub struct DrawRegistry {
    engine: DrawEngine,
    draws: Arc<RwLock<HashMap<String, DrawHandle>>>,
}

impl DrawRegistry {
    /// Create a new registry around an engine
    pub fn new(engine: DrawEngine) -> Self {
        Self {
            engine,
            draws: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn engine(&self) -> &DrawEngine {
        &self.engine
    }

    /// Register a draw, replacing any draw with the same id
    pub async fn insert(&self, draw: DrawDefinition) {
        let draw_id = draw.draw_id.clone();
        let mut draws = self.draws.write().await;
        if draws
            .insert(draw_id.clone(), Arc::new(Mutex::new(draw)))
            .is_some()
        {
            log::warn!("replaced registered draw {}", draw_id);
        }
    }

    pub async fn remove(&self, draw_id: &str) -> Option<DrawDefinition> {
        let handle = self.draws.write().await.remove(draw_id)?;
        let draw = handle.lock().await.clone();
        Some(draw)
    }

    pub async fn draw_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.draws.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    async fn handle(&self, draw_id: &str) -> DrawResult<DrawHandle> {
        self.draws
            .read()
            .await
            .get(draw_id)
            .cloned()
            .ok_or_else(|| DrawError::MissingDrawDefinition(draw_id.to_string()))
    }

    /// Copy of the current draw
    pub async fn snapshot(&self, draw_id: &str) -> DrawResult<DrawDefinition> {
        let handle = self.handle(draw_id).await?;
        let draw = handle.lock().await;
        Ok(draw.clone())
    }

    /// Run a closure with exclusive access to one draw
    pub async fn with_draw<T>(
        &self,
        draw_id: &str,
        op: impl FnOnce(&DrawEngine, &mut DrawDefinition) -> DrawResult<T>,
    ) -> DrawResult<T> {
        let handle = self.handle(draw_id).await?;
        let mut draw = handle.lock().await;
        op(&self.engine, &mut draw)
    }

    pub async fn set_match_up_status(
        &self,
        draw_id: &str,
        params: &SetMatchUpStatusParams,
    ) -> DrawResult<MatchUpOutcome> {
        self.with_draw(draw_id, |engine, draw| engine.set_match_up_status(draw, params))
            .await
    }

    pub async fn set_position_assignments(
        &self,
        draw_id: &str,
        structure_id: &str,
        assignments: &[AssignmentInput],
    ) -> DrawResult<usize> {
        self.with_draw(draw_id, |engine, draw| {
            engine.set_position_assignments(draw, structure_id, assignments)
        })
        .await
    }

    pub async fn clear_draw_position(
        &self,
        draw_id: &str,
        structure_id: &str,
        draw_position: DrawPosition,
    ) -> DrawResult<bool> {
        self.with_draw(draw_id, |engine, draw| {
            engine.clear_draw_position(draw, structure_id, draw_position)
        })
        .await
    }

    pub async fn qualifier_progression(
        &self,
        draw_id: &str,
        structure_id: &str,
        round_number: Option<u32>,
    ) -> DrawResult<Vec<ParticipantId>> {
        self.with_draw(draw_id, |engine, draw| {
            engine.qualifier_progression(draw, structure_id, round_number)
        })
        .await
    }

    pub async fn tally_participant_results(
        &self,
        draw_id: &str,
        structure_id: &str,
    ) -> DrawResult<GroupTally> {
        self.with_draw(draw_id, |engine, draw| {
            engine.tally_participant_results(draw, structure_id)
        })
        .await
    }

    pub async fn automated_playoff_positioning(
        &self,
        draw_id: &str,
        container_id: &str,
    ) -> DrawResult<Vec<PlayoffPlacement>> {
        self.with_draw(draw_id, |engine, draw| {
            engine.automated_playoff_positioning(draw, container_id)
        })
        .await
    }

    pub async fn all_draw_match_ups(&self, draw_id: &str) -> DrawResult<Vec<MatchUpView>> {
        self.with_draw(draw_id, |engine, draw| engine.all_draw_match_ups(draw))
            .await
    }
}

impl Default for DrawRegistry {
    fn default() -> Self {
        Self::new(DrawEngine::default())
    }
}
