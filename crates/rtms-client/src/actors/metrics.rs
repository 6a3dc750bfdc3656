//! Actor metrics and mailbox monitoring.
//!
//! Mailbox depth thresholds:
//!
//! | Actor Type | Normal | Warning | Critical |
//! |------------|--------|---------|----------|
//! | Registry   | < 100  | 100-500 | > 500    |
//! | Session    | < 200  | 200-1000| > 1000   |
//!
//! Session mailboxes carry every inbound media frame, so they run deeper.

use crate::observability::metrics;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Mailbox depth thresholds for the registry actor.
pub const REGISTRY_MAILBOX_NORMAL: usize = 100;
pub const REGISTRY_MAILBOX_WARNING: usize = 500;

/// Mailbox depth thresholds for session actors.
pub const SESSION_MAILBOX_NORMAL: usize = 200;
pub const SESSION_MAILBOX_WARNING: usize = 1000;

/// Actor type for metrics labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorType {
    /// `SessionRegistry` (singleton).
    Registry,
    /// `SessionActor` (one per meeting).
    Session,
}

impl ActorType {
    /// Returns the actor type as a string for metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ActorType::Registry => "registry",
            ActorType::Session => "session",
        }
    }

    #[must_use]
    pub const fn warning_threshold(&self) -> usize {
        match self {
            ActorType::Registry => REGISTRY_MAILBOX_WARNING,
            ActorType::Session => SESSION_MAILBOX_WARNING,
        }
    }

    #[must_use]
    pub const fn normal_threshold(&self) -> usize {
        match self {
            ActorType::Registry => REGISTRY_MAILBOX_NORMAL,
            ActorType::Session => SESSION_MAILBOX_NORMAL,
        }
    }

    /// Classify a mailbox depth against this actor type's thresholds.
    #[must_use]
    pub const fn level_for(&self, depth: usize) -> MailboxLevel {
        if depth > self.warning_threshold() {
            MailboxLevel::Critical
        } else if depth > self.normal_threshold() {
            MailboxLevel::Warning
        } else {
            MailboxLevel::Normal
        }
    }
}

/// Mailbox depth level for alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxLevel {
    Normal,
    Warning,
    Critical,
}

impl MailboxLevel {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            MailboxLevel::Normal => "normal",
            MailboxLevel::Warning => "warning",
            MailboxLevel::Critical => "critical",
        }
    }
}

/// Mailbox monitor fed with the actor's sampled backlog.
///
/// The owning actor calls [`MailboxMonitor::observe_backlog`] with
/// `Receiver::len()` each time it takes a message. Level changes are logged
/// once per transition.
#[derive(Debug)]
pub struct MailboxMonitor {
    actor_type: ActorType,
    /// Actor identifier (meeting UUID for sessions).
    actor_id: String,
    level: MailboxLevel,
    peak_depth: usize,
    messages_processed: u64,
}

impl MailboxMonitor {
    #[must_use]
    pub fn new(actor_type: ActorType, actor_id: impl Into<String>) -> Self {
        Self {
            actor_type,
            actor_id: actor_id.into(),
            level: MailboxLevel::Normal,
            peak_depth: 0,
            messages_processed: 0,
        }
    }

    /// Record the messages still queued behind the one being handled.
    pub fn observe_backlog(&mut self, backlog: usize) {
        self.peak_depth = self.peak_depth.max(backlog);
        metrics::set_actor_mailbox_depth(self.actor_type.as_str(), backlog);

        let level = self.actor_type.level_for(backlog);
        if level == self.level {
            return;
        }

        match level {
            MailboxLevel::Critical => warn!(
                target: "rtms.actor.mailbox",
                actor_type = self.actor_type.as_str(),
                actor_id = %self.actor_id,
                backlog,
                threshold = self.actor_type.warning_threshold(),
                "Mailbox backlog critical"
            ),
            MailboxLevel::Warning | MailboxLevel::Normal => debug!(
                target: "rtms.actor.mailbox",
                actor_type = self.actor_type.as_str(),
                actor_id = %self.actor_id,
                backlog,
                from = self.level.as_str(),
                to = level.as_str(),
                "Mailbox backlog level changed"
            ),
        }
        self.level = level;
    }

    /// Record a message having been processed.
    pub fn record_processed(&mut self) {
        self.messages_processed += 1;
    }

    /// Level of the last observed backlog.
    #[must_use]
    pub fn current_level(&self) -> MailboxLevel {
        self.level
    }

    /// Largest backlog observed so far.
    #[must_use]
    pub fn peak_depth(&self) -> usize {
        self.peak_depth
    }

    #[must_use]
    pub fn messages_processed(&self) -> u64 {
        self.messages_processed
    }
}

/// Aggregated metrics for the actor system, shared by the registry and its
/// sessions.
#[derive(Debug, Default)]
pub struct ActorMetrics {
    active_sessions: AtomicUsize,
    actor_panics: AtomicU64,
    total_messages_processed: AtomicU64,
}

impl ActorMetrics {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn session_created(&self) {
        let count = self.active_sessions.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::set_sessions_active(count);
    }

    pub fn session_removed(&self) {
        let previous = self
            .active_sessions
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(n.saturating_sub(1))
            })
            .unwrap_or(0);
        metrics::set_sessions_active(previous.saturating_sub(1));
    }

    /// Record an actor panic.
    pub fn record_panic(&self, actor_type: ActorType) {
        self.actor_panics.fetch_add(1, Ordering::Relaxed);
        tracing::error!(
            target: "rtms.actor.panic",
            actor_type = actor_type.as_str(),
            total_panics = self.actor_panics.load(Ordering::Relaxed),
            "Actor panic detected"
        );
    }

    pub fn record_message_processed(&self) {
        self.total_messages_processed.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.active_sessions.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn panic_count(&self) -> u64 {
        self.actor_panics.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn messages_processed(&self) -> u64 {
        self.total_messages_processed.load(Ordering::Relaxed)
    }
}
