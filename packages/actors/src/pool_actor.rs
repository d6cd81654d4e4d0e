//! Fixed-size worker pool.

use std::collections::VecDeque;
use std::sync::Arc;

use genq_core::{JobError, JobId};
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort, SupervisionEvent};

use crate::backend::GenerationBackend;
use crate::messages::{
    Outcome, PoolMessage, PoolStats, RouterMessage, TaggedOutcome, WorkItem, WorkerMessage,
};
use crate::table::JobTable;
use crate::worker_actor::{WorkerActor, WorkerArgs};

/// Pool actor arguments.
pub struct PoolArgs {
    /// Number of workers; at least one is always started.
    pub workers: usize,
    pub backend: Arc<dyn GenerationBackend>,
    pub router: ActorRef<RouterMessage>,
    /// Consulted at dispatch so work for already-terminal jobs is dropped.
    pub table: Arc<JobTable>,
}

struct WorkerSlot {
    worker_id: String,
    actor: ActorRef<WorkerMessage>,
    /// Job the worker is running, if any.
    current: Option<JobId>,
}

/// State for the pool actor.
pub struct PoolState {
    slots: Vec<WorkerSlot>,
    /// Admitted work waiting for an idle worker, oldest first.
    backlog: VecDeque<WorkItem>,
    accepting: bool,
    drain_waiters: Vec<RpcReplyPort<()>>,
    router: ActorRef<RouterMessage>,
    table: Arc<JobTable>,
}

impl PoolState {
    fn is_drained(&self) -> bool {
        self.backlog.is_empty() && self.slots.iter().all(|slot| slot.current.is_none())
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            workers: self.slots.len(),
            busy: self.slots.iter().filter(|slot| slot.current.is_some()).count(),
            queued: self.backlog.len(),
            accepting: self.accepting,
        }
    }

    /// Hand backlog items to idle workers in FIFO order.
    fn dispatch(&mut self) {
        while !self.backlog.is_empty() {
            let Some(slot) = self.slots.iter_mut().find(|slot| slot.current.is_none()) else {
                break;
            };
            let Some(work) = self.backlog.pop_front() else {
                break;
            };

            let job_id = work.job_id;
            if !self.table.get(&job_id).is_some_and(|job| !job.status.is_terminal()) {
                tracing::debug!("Skipping job {}: no longer pending", job_id);
                continue;
            }

            match slot.actor.send_message(WorkerMessage::Process {
                work: Box::new(work),
            }) {
                Ok(()) => {
                    tracing::debug!("Dispatched job {} to {}", job_id, slot.worker_id);
                    slot.current = Some(job_id);
                }
                Err(_) => {
                    // The supervision event removes the slot; the job fails now.
                    let worker_id = slot.worker_id.clone();
                    tracing::warn!("Worker {} is unreachable, failing job {}", worker_id, job_id);
                    self.slots.retain(|slot| slot.worker_id != worker_id);
                    self.report_failure(job_id, &worker_id, "worker is unavailable");
                }
            }
        }

        if self.slots.is_empty() {
            while let Some(work) = self.backlog.pop_front() {
                self.report_failure(work.job_id, "pool", "no workers available");
            }
        }
    }

    fn report_failure(&self, job_id: JobId, worker_id: &str, reason: &str) {
        let outcome = TaggedOutcome {
            job_id,
            worker_id: worker_id.to_string(),
            outcome: Outcome::Failed {
                error: JobError::generation(reason),
            },
        };
        if self
            .router
            .send_message(RouterMessage::Outcome(Box::new(outcome)))
            .is_err()
        {
            tracing::warn!("Result router is gone, job {} stays pending", job_id);
        }
    }

    fn notify_if_drained(&mut self) {
        if self.is_drained() {
            for waiter in self.drain_waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }
}

/// Owns the workers and the admission flag.
///
/// Submissions and `StopAccepting` share this actor's mailbox, so every
/// submission is either admitted before the flag flips or rejected after.
pub struct WorkerPool;

impl Actor for WorkerPool {
    type Msg = PoolMessage;
    type State = PoolState;
    type Arguments = PoolArgs;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let count = args.workers.max(1);
        tracing::info!("Starting worker pool with {} workers", count);

        let mut slots = Vec::with_capacity(count);
        for n in 0..count {
            let worker_id = format!("worker-{}", n);
            let (actor, _handle) = Actor::spawn_linked(
                None,
                WorkerActor,
                WorkerArgs {
                    worker_id: worker_id.clone(),
                    pool: myself.clone(),
                    router: args.router.clone(),
                    backend: args.backend.clone(),
                },
                myself.get_cell(),
            )
            .await?;

            slots.push(WorkerSlot {
                worker_id,
                actor,
                current: None,
            });
        }

        Ok(PoolState {
            slots,
            backlog: VecDeque::new(),
            accepting: true,
            drain_waiters: Vec::new(),
            router: args.router,
            table: args.table,
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            PoolMessage::Submit { work, reply } => {
                if !state.accepting {
                    tracing::debug!("Rejecting job {}: pool is shutting down", work.job_id);
                    let _ = reply.send(false);
                    return Ok(());
                }

                state.backlog.push_back(work);
                state.dispatch();
                let _ = reply.send(true);
            }

            PoolMessage::WorkerIdle { worker_id } => {
                if let Some(slot) = state.slots.iter_mut().find(|slot| slot.worker_id == worker_id) {
                    slot.current = None;
                }
                state.dispatch();
                state.notify_if_drained();
            }

            PoolMessage::StopAccepting { reply } => {
                if state.accepting {
                    tracing::info!(
                        "Worker pool stopped accepting jobs ({} queued, {} running)",
                        state.backlog.len(),
                        state.stats().busy
                    );
                }
                state.accepting = false;
                let _ = reply.send(());
                state.notify_if_drained();
            }

            PoolMessage::AwaitDrained { reply } => {
                if state.is_drained() {
                    let _ = reply.send(());
                } else {
                    state.drain_waiters.push(reply);
                }
            }

            PoolMessage::GetStats { reply } => {
                let _ = reply.send(state.stats());
            }
        }

        Ok(())
    }

    async fn handle_supervisor_evt(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: SupervisionEvent,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        let (cell, reason) = match message {
            SupervisionEvent::ActorTerminated(cell, _, reason) => {
                (cell, reason.unwrap_or_else(|| "terminated".to_string()))
            }
            SupervisionEvent::ActorFailed(cell, err) => (cell, err.to_string()),
            _ => return Ok(()),
        };

        let Some(index) = state
            .slots
            .iter()
            .position(|slot| slot.actor.get_id() == cell.get_id())
        else {
            return Ok(());
        };

        let slot = state.slots.remove(index);
        tracing::error!("Worker {} stopped unexpectedly: {}", slot.worker_id, reason);
        if let Some(job_id) = slot.current {
            state.report_failure(
                job_id,
                &slot.worker_id,
                &format!("worker {} stopped unexpectedly", slot.worker_id),
            );
        }

        state.dispatch();
        state.notify_if_drained();
        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        tracing::info!("Stopping worker pool");
        for slot in &state.slots {
            slot.actor.stop(None);
        }
        Ok(())
    }
}

/// Spawn a worker pool.
pub async fn spawn_worker_pool(
    args: PoolArgs,
) -> Result<(ActorRef<PoolMessage>, tokio::task::JoinHandle<()>), ractor::SpawnErr> {
    Actor::spawn(None, WorkerPool, args).await
}
