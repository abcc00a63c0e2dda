//! In-memory, bounded log of scaling decisions, surfaced for debugging and
//! by the health endpoint; not persisted across restarts.

use std::sync::RwLock;

use crate::crd::types::ComponentName;

const MAX_EVENTS: usize = 500;

#[derive(Clone, Debug)]
pub struct ScalingEvent {
    pub timestamp: String,
    pub namespace: String,
    pub platform: String,
    pub component: ComponentName,
    pub from_replicas: i32,
    pub to_replicas: i32,
    pub reason: String,
}

pub struct ScalingEventLog {
    events: RwLock<Vec<ScalingEvent>>,
}

impl Default for ScalingEventLog {
    fn default() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
        }
    }
}

impl ScalingEventLog {
    pub fn record(&self, event: ScalingEvent) {
        let mut events = self.events.write().unwrap();
        events.push(event);
        if events.len() > MAX_EVENTS {
            let overflow = events.len() - MAX_EVENTS;
            events.drain(0..overflow);
        }
    }

    pub fn recent(&self, limit: usize) -> Vec<ScalingEvent> {
        let events = self.events.read().unwrap();
        events.iter().rev().take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event(to: i32) -> ScalingEvent {
        ScalingEvent {
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            namespace: "default".to_string(),
            platform: "demo".to_string(),
            component: ComponentName::Prometheus,
            from_replicas: 1,
            to_replicas: to,
            reason: "test".to_string(),
        }
    }

    #[test]
    fn caps_at_max_events() {
        let log = ScalingEventLog::default();
        for i in 0..(MAX_EVENTS + 10) {
            log.record(sample_event(i as i32));
        }
        assert_eq!(log.recent(MAX_EVENTS + 10).len(), MAX_EVENTS);
    }

    #[test]
    fn recent_returns_newest_first() {
        let log = ScalingEventLog::default();
        log.record(sample_event(1));
        log.record(sample_event(2));
        let recent = log.recent(1);
        assert_eq!(recent[0].to_replicas, 2);
    }
}
