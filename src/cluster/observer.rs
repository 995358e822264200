//! Progress callbacks for detection runs

use crate::cluster::DetectionStats;

/// Receives checkpoints from a running detector.
///
/// All methods default to no-ops so implementors pick what they need.
pub trait ProgressObserver {
    /// After every local-moving pass
    fn on_pass(&mut self, _level: usize, _pass: usize, _moves: usize, _modularity: f64) {}

    /// After a level's communities are fixed, before aggregation
    fn on_level(&mut self, _level: usize, _nodes: usize, _communities: usize) {}

    fn on_finish(&mut self, _stats: &DetectionStats) {}
}

/// Ignores every checkpoint
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}

/// Reports checkpoints through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn on_pass(&mut self, level: usize, pass: usize, moves: usize, modularity: f64) {
        log::debug!(
            "Level {} pass {}: {} moves, modularity {:.6}",
            level, pass, moves, modularity
        );
    }

    fn on_level(&mut self, level: usize, nodes: usize, communities: usize) {
        log::info!("Level {}: {} nodes -> {} communities", level, nodes, communities);
    }

    fn on_finish(&mut self, stats: &DetectionStats) {
        log::info!(
            "Detection finished after {} levels, modularity {:.6}",
            stats.levels.len(),
            stats.modularity
        );
    }
}
