// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Executor lookup by task kind.

use std::collections::HashMap;
use std::sync::Arc;

use meetlr_core::TaskKind;
use tracing::warn;

use crate::executor::TaskExecutor;

#[derive(Default)]
pub struct ExecutorRegistry {
    executors: HashMap<TaskKind, Arc<dyn TaskExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `executor` for every kind it declares. A later registration
    /// replaces an earlier one for the same kind.
    pub fn register(&mut self, executor: Arc<dyn TaskExecutor>) {
        for kind in executor.kinds() {
            if let Some(previous) = self.executors.insert(*kind, Arc::clone(&executor)) {
                warn!(
                    %kind,
                    previous = previous.name(),
                    replacement = executor.name(),
                    "replacing task executor"
                );
            }
        }
    }

    pub fn get(&self, kind: TaskKind) -> Option<Arc<dyn TaskExecutor>> {
        self.executors.get(&kind).cloned()
    }

    /// Kinds that would be archived as failed for want of an executor.
    pub fn missing_kinds(&self) -> Vec<TaskKind> {
        TaskKind::ALL
            .into_iter()
            .filter(|k| !self.executors.contains_key(k))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ExecutionError, ExecutionOutcome};
    use async_trait::async_trait;
    use meetlr_core::{Booking, PendingTask};

    struct Noop(&'static str, &'static [TaskKind]);

    #[async_trait]
    impl TaskExecutor for Noop {
        fn name(&self) -> &'static str {
            self.0
        }

        fn kinds(&self) -> &'static [TaskKind] {
            self.1
        }

        async fn execute(
            &self,
            _: &PendingTask,
            _: Option<&Booking>,
        ) -> Result<ExecutionOutcome, ExecutionError> {
            Ok(ExecutionOutcome::done())
        }
    }

    #[test]
    fn registers_each_declared_kind() {
        let mut r = ExecutorRegistry::new();
        r.register(Arc::new(Noop(
            "refunds",
            &[TaskKind::RefundPayment],
        )));
        r.register(Arc::new(Noop(
            "meetings",
            &[TaskKind::VideoMeetingCreate, TaskKind::VideoMeetingDelete],
        )));
        assert_eq!(r.len(), 3);
        assert_eq!(r.get(TaskKind::VideoMeetingDelete).unwrap().name(), "meetings");
        assert!(r.get(TaskKind::ConfirmationEmail).is_none());
        assert_eq!(r.missing_kinds().len(), TaskKind::ALL.len() - 3);
    }
}
