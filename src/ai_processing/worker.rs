// src/ai_processing/worker.rs
//! Background loop that drains the AI queue with the configured analyzer

use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::queue::AiQueue;
use crate::common::{new_id, AppState};

/// Upper bound of tasks handled per tick so one tick cannot run forever
const MAX_TASKS_PER_TICK: usize = 25;

pub fn start_worker(state: AppState) -> JoinHandle<()> {
    let worker_id = format!("worker-{}", &new_id()[..8]);
    let period = Duration::from_secs(state.config.ai.worker_interval_secs.max(1));
    info!(worker_id = %worker_id, interval_secs = period.as_secs(), "Starting AI queue worker");

    tokio::spawn(async move {
        let queue = AiQueue::new(state.db.clone());
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            drain(&queue, &state, &worker_id).await;
        }
    })
}

/// Processes tasks until the queue is empty; returns how many were handled
pub async fn drain(queue: &AiQueue, state: &AppState, worker_id: &str) -> usize {
    let mut handled = 0;
    while handled < MAX_TASKS_PER_TICK {
        match queue.process_next(&*state.ai, worker_id).await {
            Ok(Some(done)) => {
                handled += 1;
                info!(task_id = %done.task.id, status = %done.task.status, "Worker processed AI task");
            }
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, worker_id = %worker_id, "AI worker failed to process task");
                break;
            }
        }
    }
    handled
}
