// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle event dispatcher.
//!
//! Handlers are registered per [`LifecycleKind`] and invoked synchronously
//! inside the unit of work that raised the event. Each handler maps the
//! event plus the already-updated booking to zero or more pending tasks.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use meetlr_core::{Booking, LifecycleEvent, LifecycleKind, MeetlrError, PendingTask};

use crate::policy::TaskPolicy;

/// Values every handler needs when building rows.
#[derive(Debug, Clone)]
pub struct EnqueueContext {
    pub now: DateTime<Utc>,
    pub policy: TaskPolicy,
}

/// Maps one lifecycle event to the tasks it should enqueue.
///
/// Returning an empty vector means the handler's preconditions were not met
/// (no meeting to delete, no payment to refund); that is not an error.
pub trait EventHandler: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    fn handle(
        &self,
        event: &LifecycleEvent,
        booking: &Booking,
        ctx: &EnqueueContext,
    ) -> Result<Vec<PendingTask>, MeetlrError>;
}

/// The outcome of one handler for one event.
#[derive(Debug)]
pub struct HandlerOutput {
    pub handler: &'static str,
    pub result: Result<Vec<PendingTask>, MeetlrError>,
}

/// Registry of event handlers keyed by lifecycle kind.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<LifecycleKind, Vec<Arc<dyn EventHandler>>>,
}

impl EventDispatcher {
    /// An empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher wired with the standard post-event fan-out.
    pub fn with_default_handlers() -> Self {
        let mut d = Self::new();
        crate::handlers::register_defaults(&mut d);
        d
    }

    pub fn register(&mut self, kind: LifecycleKind, handler: Arc<dyn EventHandler>) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    pub fn handler_count(&self, kind: LifecycleKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Run every handler registered for the event's kind.
    ///
    /// One handler's failure never hides another handler's rows.
    pub fn dispatch(
        &self,
        event: &LifecycleEvent,
        booking: &Booking,
        ctx: &EnqueueContext,
    ) -> Vec<HandlerOutput> {
        self.handlers
            .get(&event.kind())
            .map(|handlers| {
                handlers
                    .iter()
                    .map(|h| HandlerOutput {
                        handler: h.name(),
                        result: h.handle(event, booking, ctx),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meetlr_core::{LifecycleDetail, TaskKind, TaskPayload, TaskTrigger};
    use meetlr_test_utils::fixtures::confirmed_booking;

    struct Fixed(&'static str, usize);

    impl EventHandler for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn handle(
            &self,
            event: &LifecycleEvent,
            booking: &Booking,
            ctx: &EnqueueContext,
        ) -> Result<Vec<PendingTask>, MeetlrError> {
            Ok((0..self.1)
                .map(|_| {
                    PendingTask::for_booking(
                        booking,
                        TaskKind::CancellationEmail,
                        TaskTrigger::from(event.kind()),
                        TaskPayload::Notification {
                            template: TaskKind::CancellationEmail,
                            subject: "x".into(),
                            variables: Default::default(),
                        },
                        ctx.now,
                    )
                })
                .collect())
        }
    }

    struct Broken;

    impl EventHandler for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn handle(
            &self,
            _: &LifecycleEvent,
            _: &Booking,
            _: &EnqueueContext,
        ) -> Result<Vec<PendingTask>, MeetlrError> {
            Err(MeetlrError::Internal("template missing".into()))
        }
    }

    #[test]
    fn dispatch_runs_only_matching_handlers_and_isolates_errors() {
        let mut d = EventDispatcher::new();
        d.register(LifecycleKind::Cancelled, Arc::new(Fixed("two", 2)));
        d.register(LifecycleKind::Cancelled, Arc::new(Broken));
        d.register(LifecycleKind::Completed, Arc::new(Fixed("other", 1)));

        let booking = confirmed_booking("b1");
        let event = LifecycleEvent::new(
            &booking,
            LifecycleDetail::Cancelled {
                reason: None,
                payment_involved: false,
            },
            booking.updated_at,
        );
        let ctx = EnqueueContext {
            now: booking.updated_at,
            policy: TaskPolicy::default(),
        };

        let outputs = d.dispatch(&event, &booking, &ctx);
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].handler, "two");
        assert_eq!(outputs[0].result.as_ref().unwrap().len(), 2);
        assert!(outputs[1].result.is_err());
    }

    #[test]
    fn created_has_no_default_handlers() {
        let d = EventDispatcher::with_default_handlers();
        assert_eq!(d.handler_count(LifecycleKind::Created), 0);
        assert!(d.handler_count(LifecycleKind::Completed) > 0);
        assert!(d.handler_count(LifecycleKind::Cancelled) > 0);
        assert!(d.handler_count(LifecycleKind::Rescheduled) > 0);
    }
}
