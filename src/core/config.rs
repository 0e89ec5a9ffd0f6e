//! # Global hub configuration.
//!
//! Provides [`Config`] centralized settings for the hub runtime.
//!
//! Config is consumed once, by [`HubBuilder::build`](crate::HubBuilder::build):
//! it sizes the command channel, the runtime event bus, every observer queue and
//! the persistence queue.
//!
//! ## Clamping
//! Fields are plain values; out-of-range values are clamped by the `*_clamped`
//! accessors instead of being rejected.

/// Global configuration for the hub runtime.
///
/// ## Field semantics
/// - `command_capacity`: inbound command channel size (min 1)
/// - `bus_capacity`: runtime event bus ring buffer size (min 1)
/// - `observer_queue_capacity`: per-observer queue size (min 2, the baseline must fit)
/// - `max_observer_drops`: dropped messages before a slow observer is evicted (min 1)
/// - `persistence_queue_capacity`: pending persistence ops before new ones are dropped (min 1)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Capacity of the command channel in front of the hub actor.
    ///
    /// Callers of [`HubHandle`](crate::HubHandle) wait when it is full.
    pub command_capacity: usize,

    /// Capacity of the runtime event bus.
    ///
    /// Subscribers lagging behind more than `bus_capacity` events skip the oldest ones.
    pub bus_capacity: usize,

    /// Capacity of each observer's outbound queue.
    pub observer_queue_capacity: usize,

    /// Number of dropped messages after which an observer is evicted.
    pub max_observer_drops: u64,

    /// Capacity of the persistence queue.
    pub persistence_queue_capacity: usize,
}

impl Config {
    #[inline]
    pub fn command_capacity_clamped(&self) -> usize {
        self.command_capacity.max(1)
    }

    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Observer queue capacity, at least 2 so a full baseline always fits.
    #[inline]
    pub fn observer_queue_capacity_clamped(&self) -> usize {
        self.observer_queue_capacity.max(2)
    }

    #[inline]
    pub fn max_observer_drops_clamped(&self) -> u64 {
        self.max_observer_drops.max(1)
    }

    #[inline]
    pub fn persistence_queue_capacity_clamped(&self) -> usize {
        self.persistence_queue_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `command_capacity = 1024`
    /// - `bus_capacity = 1024`
    /// - `observer_queue_capacity = 256`
    /// - `max_observer_drops = 100`
    /// - `persistence_queue_capacity = 4096`
    fn default() -> Self {
        Self {
            command_capacity: 1024,
            bus_capacity: 1024,
            observer_queue_capacity: 256,
            max_observer_drops: 100,
            persistence_queue_capacity: 4096,
        }
    }
}
