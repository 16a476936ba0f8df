//! Shell-facing notifications and the broadcast bus that carries them.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::scenario::{HitlCheckpoint, ProgressTask};
use crate::slides::SlideItem;

/// Default channel capacity for the event bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Side panel the shell should show next to the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Panel {
    /// Analytical dashboard with drillable charts.
    Dashboard,
    /// Live slide preview.
    SlidePreview,
    /// Generated artifact list.
    Artifacts,
}

/// A notification from one of the engines.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A scripted step began rendering.
    StepStarted {
        /// Step id.
        step_id: String,
    },
    /// The derived progress list changed.
    ProgressUpdated {
        /// Recomputed task list.
        tasks: Vec<ProgressTask>,
    },
    /// The scenario paused and is waiting for a human choice.
    CheckpointReached {
        /// The live checkpoint.
        checkpoint: HitlCheckpoint,
    },
    /// The terminal step finished. Emitted once per run.
    ScenarioCompleted,
    /// The target slide count changed before generation.
    SlideCountChanged {
        /// New count.
        count: usize,
    },
    /// Slide statuses changed (generation started or a slide completed).
    SlidesChanged {
        /// Current deck.
        slides: Vec<SlideItem>,
    },
    /// Completion-based deck progress moved.
    SlideProgress {
        /// Percentage in `0..=100`.
        percent: u8,
    },
    /// The last slide completed. Emitted once per run.
    GenerationCompleted,
    /// A visualization finished (or was withdrawn).
    VisualizationComplete {
        /// Whether the visualization is complete.
        complete: bool,
    },
    /// The shell should switch its side panel.
    PanelChanged {
        /// Panel to show.
        panel: Panel,
    },
}

impl EngineEvent {
    /// Short name used in logs.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::StepStarted { .. } => "step_started",
            Self::ProgressUpdated { .. } => "progress_updated",
            Self::CheckpointReached { .. } => "checkpoint_reached",
            Self::ScenarioCompleted => "scenario_completed",
            Self::SlideCountChanged { .. } => "slide_count_changed",
            Self::SlidesChanged { .. } => "slides_changed",
            Self::SlideProgress { .. } => "slide_progress",
            Self::GenerationCompleted => "generation_completed",
            Self::VisualizationComplete { .. } => "visualization_complete",
            Self::PanelChanged { .. } => "panel_changed",
        }
    }
}

/// Broadcasts engine events to every subscriber.
///
/// Events are delivered in publish order. A receiver that falls more than
/// the channel capacity behind loses the oldest events and is told so.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<EngineEvent>>,
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender, capacity }
    }

    /// Publish an event, returning how many receivers got it.
    pub fn publish(&self, event: EngineEvent) -> usize {
        let event_type = event.event_type();
        if let Ok(count) = self.sender.send(Arc::new(event)) {
            debug!(event_type, receiver_count = count, "Event published");
            count
        } else {
            trace!(event_type, "No receivers for event");
            0
        }
    }

    /// Subscribe to all subsequently published events.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live receivers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end of an [`EventBus`].
pub struct EventReceiver {
    receiver: broadcast::Receiver<Arc<EngineEvent>>,
}

impl EventReceiver {
    /// Receive the next event, or `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<Arc<EngineEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(skipped = count, "Event receiver lagged, events dropped");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Receive without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<EngineEvent>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(skipped = count, "Event receiver lagged, events dropped");
                },
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        assert_eq!(bus.publish(EngineEvent::ScenarioCompleted), 2);

        assert_eq!(*a.recv().await.unwrap(), EngineEvent::ScenarioCompleted);
        assert_eq!(*b.recv().await.unwrap(), EngineEvent::ScenarioCompleted);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::with_capacity(4);
        assert_eq!(bus.publish(EngineEvent::GenerationCompleted), 0);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.capacity(), 4);
    }

    #[test]
    fn test_events_preserve_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.publish(EngineEvent::StepStarted {
            step_id: "a".to_owned(),
        });
        bus.publish(EngineEvent::ScenarioCompleted);

        assert_eq!(rx.try_recv().unwrap().event_type(), "step_started");
        assert_eq!(rx.try_recv().unwrap().event_type(), "scenario_completed");
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_string(&EngineEvent::PanelChanged {
            panel: Panel::Dashboard,
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"panel_changed","panel":"dashboard"}"#);
    }
}
