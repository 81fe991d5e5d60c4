//! Concurrent fan-out of one message to every recipient
//!
//! Dispatch runs in two phases. [`Dispatcher::deliver_all`] sends to every
//! recipient at once and only collects classified outcomes. [`Dispatcher::prune`]
//! then removes the recipients the push service reported as gone. A failure for
//! one recipient never aborts or delays another, in either phase.

use crate::Result;
use crate::push::{FailureClass, PushFailure, PushTransport};
use crate::store::RecipientStore;
use crate::types::{PushMessage, Recipient, RecipientId};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of one delivery attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The push service accepted the message
    Delivered,
    /// The attempt failed
    Failed {
        /// Permanent or transient
        class: FailureClass,
        /// What the transport reported
        failure: PushFailure,
    },
}

impl DeliveryOutcome {
    fn from_result(result: std::result::Result<(), PushFailure>) -> Self {
        match result {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(failure) => DeliveryOutcome::Failed {
                class: failure.class(),
                failure,
            },
        }
    }
}

/// Outcomes of one fan-out, in recipient order
#[derive(Clone, Debug, Default)]
pub struct DeliveryReport {
    /// One entry per recipient
    pub outcomes: Vec<(RecipientId, DeliveryOutcome)>,
}

impl DeliveryReport {
    /// Number of successful deliveries
    pub fn delivered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, DeliveryOutcome::Delivered))
            .count()
    }

    /// Recipients reported as permanently gone
    pub fn to_prune(&self) -> Vec<RecipientId> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| {
                matches!(
                    outcome,
                    DeliveryOutcome::Failed {
                        class: FailureClass::PermanentlyInvalid,
                        ..
                    }
                )
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Number of failures that were not permanent
    pub fn transient_failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| {
                matches!(
                    outcome,
                    DeliveryOutcome::Failed {
                        class: FailureClass::Transient,
                        ..
                    }
                )
            })
            .count()
    }
}

/// Result of the prune phase
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    /// Rows actually deleted
    pub removed: usize,
    /// Ids that no longer existed
    pub already_gone: usize,
    /// Deletes that failed; the recipient stays until the next dispatch
    pub failed: usize,
}

/// Totals for a complete dispatch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    /// Recipients attempted
    pub attempted: usize,
    /// Successful deliveries
    pub delivered: usize,
    /// Failures that were logged and kept
    pub transient_failures: usize,
    /// Prune phase results
    pub pruned: PruneReport,
}

/// Fans messages out through a [`PushTransport`] and prunes dead recipients
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn PushTransport>,
    recipients: Arc<dyn RecipientStore>,
}

impl Dispatcher {
    /// Create a dispatcher
    pub fn new(transport: Arc<dyn PushTransport>, recipients: Arc<dyn RecipientStore>) -> Self {
        Self {
            transport,
            recipients,
        }
    }

    /// Send `payload` to every recipient concurrently and wait for all of them
    ///
    /// Has no side effects besides the sends themselves.
    pub async fn deliver_all(&self, payload: &[u8], recipients: &[Recipient]) -> DeliveryReport {
        let attempts = recipients.iter().map(|recipient| async move {
            let outcome = DeliveryOutcome::from_result(self.transport.send(recipient, payload).await);

            match &outcome {
                DeliveryOutcome::Delivered => {
                    debug!(recipient_id = %recipient.id, "push delivered");
                }
                DeliveryOutcome::Failed {
                    class: FailureClass::PermanentlyInvalid,
                    failure,
                } => {
                    info!(
                        recipient_id = %recipient.id,
                        status = ?failure.status,
                        "push endpoint gone, scheduling removal"
                    );
                }
                DeliveryOutcome::Failed {
                    class: FailureClass::Transient,
                    failure,
                } => {
                    warn!(
                        recipient_id = %recipient.id,
                        status = ?failure.status,
                        error = %failure.message,
                        "push delivery failed"
                    );
                }
            }

            (recipient.id.clone(), outcome)
        });

        DeliveryReport {
            outcomes: join_all(attempts).await,
        }
    }

    /// Delete every id in `ids`, isolating failures per id
    pub async fn prune(&self, ids: &[RecipientId]) -> PruneReport {
        let mut report = PruneReport::default();

        for id in ids {
            match self.recipients.delete(id).await {
                Ok(true) => report.removed += 1,
                Ok(false) => report.already_gone += 1,
                Err(e) => {
                    warn!(recipient_id = %id, error = %e, "failed to remove dead recipient");
                    report.failed += 1;
                }
            }
        }

        if report.removed > 0 {
            info!(removed = report.removed, "pruned dead recipients");
        }

        report
    }

    /// Encode `message`, deliver it to `recipients`, then prune the dead ones
    ///
    /// Only message encoding can fail; delivery and prune failures are counted
    /// in the summary.
    pub async fn dispatch(
        &self,
        message: &PushMessage,
        recipients: &[Recipient],
    ) -> Result<DispatchSummary> {
        let payload = message.to_bytes()?;

        let report = self.deliver_all(&payload, recipients).await;
        let pruned = self.prune(&report.to_prune()).await;

        let summary = DispatchSummary {
            attempted: recipients.len(),
            delivered: report.delivered(),
            transient_failures: report.transient_failures(),
            pruned,
        };

        info!(
            attempted = summary.attempted,
            sent = summary.delivered,
            failed = summary.transient_failures,
            pruned = summary.pruned.removed,
            "dispatch complete"
        );

        Ok(summary)
    }
}
