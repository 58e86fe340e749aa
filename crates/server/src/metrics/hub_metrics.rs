use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct HubMetrics {
    clients_registered_total: AtomicU64,
    clients_unregistered_total: AtomicU64,
    clients_evicted_total: AtomicU64,
    messages_broadcast_total: AtomicU64,
    frames_delivered_total: AtomicU64,
    frames_dropped_total: AtomicU64,
    clients_connected: AtomicU64,
}

impl HubMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_clients_registered(&self) {
        self.clients_registered_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_clients_unregistered(&self) {
        self.clients_unregistered_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_clients_evicted(&self) {
        self.clients_evicted_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_messages_broadcast(&self) {
        self.messages_broadcast_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_frames_delivered(&self, count: u64) {
        self.frames_delivered_total.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_frames_dropped(&self, count: u64) {
        self.frames_dropped_total.fetch_add(count, Ordering::Relaxed);
    }

    pub fn set_clients_connected(&self, count: u64) {
        self.clients_connected.store(count, Ordering::Relaxed);
    }

    pub fn clients_registered_val(&self) -> u64 {
        self.clients_registered_total.load(Ordering::Relaxed)
    }

    pub fn clients_unregistered_val(&self) -> u64 {
        self.clients_unregistered_total.load(Ordering::Relaxed)
    }

    pub fn clients_evicted_val(&self) -> u64 {
        self.clients_evicted_total.load(Ordering::Relaxed)
    }

    pub fn messages_broadcast_val(&self) -> u64 {
        self.messages_broadcast_total.load(Ordering::Relaxed)
    }

    pub fn frames_delivered_val(&self) -> u64 {
        self.frames_delivered_total.load(Ordering::Relaxed)
    }

    pub fn frames_dropped_val(&self) -> u64 {
        self.frames_dropped_total.load(Ordering::Relaxed)
    }

    pub fn clients_connected_val(&self) -> u64 {
        self.clients_connected.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = HubMetrics::new();
        m.inc_clients_registered();
        m.inc_clients_registered();
        m.inc_clients_evicted();
        m.add_frames_delivered(10);
        m.add_frames_dropped(2);
        m.set_clients_connected(1);

        assert_eq!(m.clients_registered_val(), 2);
        assert_eq!(m.clients_evicted_val(), 1);
        assert_eq!(m.frames_delivered_val(), 10);
        assert_eq!(m.frames_dropped_val(), 2);
        assert_eq!(m.clients_connected_val(), 1);
    }
}
