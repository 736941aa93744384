//! Pipeline thread.
//!
//! Receives audio blocks over a channel and runs them through a
//! [`JumpPipeline`] strictly in arrival order. The latest pitch event is
//! published via `ArcSwap` for lock-free reads from any thread.

use crate::pipeline::JumpPipeline;
use arc_swap::ArcSwapOption;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use pitchhop_analysis::AudioBlock;
use pitchhop_core::PitchEvent;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// How long the thread waits for a block before re-checking the running flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Shared state between the pipeline thread and the engine handle.
pub struct PipelineState {
    /// Most recent pitch event.
    pub latest: ArcSwapOption<PitchEvent>,
    blocks_processed: AtomicU64,
    block_size: AtomicUsize,
    running: AtomicBool,
}

impl PipelineState {
    pub fn new(block_size: usize) -> Self {
        Self {
            latest: ArcSwapOption::const_empty(),
            blocks_processed: AtomicU64::new(0),
            block_size: AtomicUsize::new(block_size),
            running: AtomicBool::new(true),
        }
    }

    /// Signal the pipeline thread to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn blocks_processed(&self) -> u64 {
        self.blocks_processed.load(Ordering::Relaxed)
    }

    /// Block size the detector currently expects.
    pub fn block_size(&self) -> usize {
        self.block_size.load(Ordering::Relaxed)
    }
}

/// Run the pipeline loop.
///
/// Blocks until `state.stop()` is called or every sender is dropped.
pub fn run_pipeline_thread(
    mut pipeline: JumpPipeline,
    blocks: Receiver<AudioBlock>,
    state: Arc<PipelineState>,
) {
    info!("Pipeline thread started ({} samples per block)", pipeline.block_size());

    while state.is_running() {
        let block = match blocks.recv_timeout(POLL_INTERVAL) {
            Ok(block) => block,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let outcome = pipeline.process_block(&block, Instant::now());
        state.latest.store(Some(Arc::new(outcome.event)));
        state.block_size.store(pipeline.block_size(), Ordering::Relaxed);
        state.blocks_processed.fetch_add(1, Ordering::Relaxed);
    }

    state.stop();
    info!(
        "Pipeline thread stopped after {} blocks",
        state.blocks_processed()
    );
}
