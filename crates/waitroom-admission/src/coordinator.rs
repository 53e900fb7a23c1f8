//! The admission coordinator: the one place that mutates the capacity
//! store and the wait queue.
//!
//! Every operation takes the same async mutex, so "check capacity, admit
//! or enqueue" and "dequeue head, admit" are each a single atomic step.
//! Notifications are pushed before the lock is released, so the events a
//! channel receives follow the order of the decisions behind them. Pushes
//! only enqueue on unbounded channels; a slow or dead browser never
//! stalls admission.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use waitroom_protocol::SessionId;

use crate::{AdmissionConfig, AdmissionError, CapacityStore, NotificationHub, QueueEvent, WaitQueue};

/// Result of [`Coordinator::join`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The visitor holds a slot (newly, or already did).
    Admitted,
    /// The visitor is waiting at this 1-based position.
    Queued { position: usize },
}

impl JoinOutcome {
    fn event(&self) -> QueueEvent {
        match self {
            Self::Admitted => QueueEvent::Admitted,
            Self::Queued { position } => QueueEvent::QueuePosition { position: *position },
        }
    }
}

/// Where a visitor stands, as seen by [`Coordinator::position`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Standing {
    Admitted,
    Waiting { position: usize },
    Unknown,
}

/// Result of [`Coordinator::expire`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpireOutcome {
    /// The session was refreshed after it was found lapsed; nothing done.
    Retained,
    /// The session was already gone (evicted by an earlier sweep, or reset).
    Absent,
    /// The session was evicted, and the queue head (if any) took its slot.
    Evicted { promoted: Option<SessionId> },
}

/// Counts for `GET /queue-status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub queue_length: usize,
    pub active_users: usize,
    pub active_users_members: Vec<SessionId>,
}

/// Full diagnostic view for `GET /redis-data`.
///
/// `all_keys` maps each active identity to its remaining lifetime in whole
/// seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDump {
    pub queue: Vec<SessionId>,
    pub active_users: Vec<SessionId>,
    pub all_keys: BTreeMap<String, u64>,
}

// ---------------------------------------------------------------------------
// State (guarded by the coordinator's lock)
// ---------------------------------------------------------------------------

/// A successful promotion, plus the line as it stands afterwards.
struct Promotion {
    admitted: SessionId,
    waiting: Vec<SessionId>,
}

impl Promotion {
    /// Admitted for the promoted visitor, a fresh position for everyone
    /// still waiting.
    fn events(self) -> Vec<(SessionId, QueueEvent)> {
        let mut events = Vec::with_capacity(self.waiting.len() + 1);
        events.push((self.admitted, QueueEvent::Admitted));
        events.extend(
            self.waiting
                .into_iter()
                .enumerate()
                .map(|(index, id)| (id, QueueEvent::QueuePosition { position: index + 1 })),
        );
        events
    }
}

#[derive(Debug)]
struct AdmissionState {
    store: CapacityStore,
    queue: WaitQueue,
}

impl AdmissionState {
    fn join(&mut self, id: &SessionId) -> JoinOutcome {
        if self.store.is_active(id) {
            self.store.refresh(id);
            return JoinOutcome::Admitted;
        }
        if let Some(position) = self.queue.position_of(id) {
            return JoinOutcome::Queued { position };
        }
        // Nobody jumps the line: a free slot goes to the queue head first.
        if self.queue.is_empty() && self.store.try_admit(id) {
            return JoinOutcome::Admitted;
        }
        JoinOutcome::Queued {
            position: self.queue.enqueue(id),
        }
    }

    fn promote(&mut self) -> Result<Option<Promotion>, AdmissionError> {
        let Some(head) = self.queue.dequeue_head() else {
            return Ok(None);
        };
        if !self.store.try_admit(&head) {
            tracing::warn!(session_id = %head, "no free slot for queue head, re-queued");
            self.queue.requeue_front(head.clone());
            return Err(AdmissionError::PromotionRace(head));
        }
        Ok(Some(Promotion {
            admitted: head,
            waiting: self.queue.snapshot(),
        }))
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Serializes every admission decision.
///
/// Share it behind an `Arc`; all methods take `&self`.
#[derive(Debug)]
pub struct Coordinator {
    state: Mutex<AdmissionState>,
    hub: Arc<NotificationHub>,
    session_ttl: Duration,
    lock_timeout: Duration,
}

impl Coordinator {
    pub fn new(config: &AdmissionConfig, hub: Arc<NotificationHub>) -> Self {
        let config = config.clone().validated();
        Self {
            state: Mutex::new(AdmissionState {
                store: CapacityStore::new(config.capacity, config.session_ttl),
                queue: WaitQueue::new(),
            }),
            hub,
            session_ttl: config.session_ttl,
            lock_timeout: config.lock_timeout,
        }
    }

    /// The hub this coordinator notifies.
    pub fn hub(&self) -> &Arc<NotificationHub> {
        &self.hub
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    async fn lock(&self) -> Result<MutexGuard<'_, AdmissionState>, AdmissionError> {
        tokio::time::timeout(self.lock_timeout, self.state.lock())
            .await
            .map_err(|_| {
                tracing::error!(timeout_ms = self.lock_timeout.as_millis() as u64, "admission lock timed out");
                AdmissionError::StoreUnavailable(format!(
                    "admission lock not acquired within {}ms",
                    self.lock_timeout.as_millis()
                ))
            })
    }

    /// Admits `id`, or puts it in line.
    ///
    /// Idempotent: an active visitor gets its TTL refreshed and is told
    /// it's admitted again; a waiting visitor is told its current position
    /// without moving. The outcome is also pushed to `id`'s live channel,
    /// and so is the reason if the join fails.
    pub async fn join(&self, id: &SessionId) -> Result<JoinOutcome, AdmissionError> {
        let mut state = match self.lock().await {
            Ok(state) => state,
            Err(e) => {
                self.hub
                    .push(id, QueueEvent::Error { reason: e.to_string() })
                    .await;
                return Err(e);
            }
        };
        let outcome = state.join(id);
        match &outcome {
            JoinOutcome::Admitted => tracing::info!(session_id = %id, "admitted"),
            JoinOutcome::Queued { position } => tracing::info!(session_id = %id, position, "queued"),
        }
        self.hub.push(id, outcome.event()).await;
        Ok(outcome)
    }

    /// Moves the head of the line into a free slot.
    ///
    /// Returns the promoted identity, or `None` if nobody is waiting. On
    /// success the promoted visitor is told it's admitted and everyone
    /// still waiting gets their new position.
    pub async fn promote(&self) -> Result<Option<SessionId>, AdmissionError> {
        let mut state = self.lock().await?;
        let promotion = state.promote()?;
        Ok(self.announce(promotion).await)
    }

    /// Evicts `id` if its session has lapsed, then promotes once.
    ///
    /// The lapse is re-checked under the lock, so a refresh that lands
    /// between the sweep's scan and this call keeps the visitor in.
    pub async fn expire(&self, id: &SessionId) -> Result<ExpireOutcome, AdmissionError> {
        let mut state = self.lock().await?;
        match state.store.is_lapsed(id) {
            None => return Ok(ExpireOutcome::Absent),
            Some(false) => return Ok(ExpireOutcome::Retained),
            Some(true) => {}
        }
        state.store.evict(id);
        tracing::info!(session_id = %id, "session expired");
        let promotion = state.promote()?;
        let promoted = self.announce(promotion).await;
        Ok(ExpireOutcome::Evicted { promoted })
    }

    /// Pushes a promotion's events. Callers still hold the admission lock.
    async fn announce(&self, promotion: Option<Promotion>) -> Option<SessionId> {
        let promotion = promotion?;
        let promoted = promotion.admitted.clone();
        tracing::info!(session_id = %promoted, waiting = promotion.waiting.len(), "promoted");
        self.hub.push_all(promotion.events()).await;
        Some(promoted)
    }

    /// Extends an active visitor's TTL.
    pub async fn refresh_activity(&self, id: &SessionId) -> Result<(), AdmissionError> {
        if self.lock().await?.store.refresh(id) {
            tracing::debug!(session_id = %id, "session refreshed");
            Ok(())
        } else {
            Err(AdmissionError::NotActive(id.clone()))
        }
    }

    /// Checks that `id` holds a slot, without touching it.
    pub async fn validate(&self, id: &SessionId) -> Result<(), AdmissionError> {
        if self.lock().await?.store.is_active(id) {
            Ok(())
        } else {
            Err(AdmissionError::NotActive(id.clone()))
        }
    }

    /// Where `id` stands right now.
    pub async fn position(&self, id: &SessionId) -> Result<Standing, AdmissionError> {
        let state = self.lock().await?;
        if state.store.is_active(id) {
            return Ok(Standing::Admitted);
        }
        Ok(match state.queue.position_of(id) {
            Some(position) => Standing::Waiting { position },
            None => Standing::Unknown,
        })
    }

    /// Empties both the active set and the queue.
    ///
    /// Nobody is notified; bound channels simply hear nothing until their
    /// visitor joins again.
    pub async fn reset(&self) -> Result<(), AdmissionError> {
        let mut state = self.lock().await?;
        let (active, waiting) = (state.store.count(), state.queue.len());
        state.store.clear();
        state.queue.clear();
        tracing::info!(active, waiting, "admission state reset");
        Ok(())
    }

    /// Lapsed sessions, earliest deadline first.
    pub async fn lapsed_members(&self) -> Result<Vec<SessionId>, AdmissionError> {
        Ok(self.lock().await?.store.lapsed_members())
    }

    pub async fn status(&self) -> Result<QueueStatus, AdmissionError> {
        let state = self.lock().await?;
        Ok(QueueStatus {
            queue_length: state.queue.len(),
            active_users: state.store.count(),
            active_users_members: state.store.members(),
        })
    }

    pub async fn dump(&self) -> Result<StoreDump, AdmissionError> {
        let state = self.lock().await?;
        let active_users = state.store.members();
        let all_keys = active_users
            .iter()
            .filter_map(|id| {
                state
                    .store
                    .expires_in(id)
                    .map(|left| (id.to_string(), left.as_secs()))
            })
            .collect();
        Ok(StoreDump {
            queue: state.queue.snapshot(),
            active_users,
            all_keys,
        })
    }
}

// =========================================================================
// Tests
// =========================================================================
