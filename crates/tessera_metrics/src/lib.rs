//! Tessera Metrics - counters and timers for the storage engine
//!
//! Provides zero-cost instrumentation that completely vanishes in
//! production builds via feature flags.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use tessera_metrics::{PassCount, PassTimer, StructuralCounters, StructuralEvent};
//!
//! let mut counters = StructuralCounters::new();
//! counters.record(StructuralEvent::PageCreated);
//!
//! let mut timer = PassTimer::new();
//! timer.begin();
//! // ... iterate the store, counting pages and entities ...
//! timer.end(PassCount { pages: 3, entities: 40 });
//! println!("pass: {:.3} ms", timer.mean_ms());
//! ```
//!
//! Without the `metrics` feature every type below is an empty stub.

#[cfg(feature = "metrics")]
mod pass_timer;
#[cfg(feature = "metrics")]
mod structural;

#[cfg(feature = "metrics")]
pub use pass_timer::PassTimer;
#[cfg(feature = "metrics")]
pub use structural::StructuralCounters;

/// Structural changes tracked by [`StructuralCounters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructuralEvent {
    EntityCreated,
    EntityDestroyed,
    Floated,
    Unfloated,
    PageCreated,
    PageRecycled,
    ArchetypeCreated,
}

impl StructuralEvent {
    pub const ALL: [StructuralEvent; 7] = [
        StructuralEvent::EntityCreated,
        StructuralEvent::EntityDestroyed,
        StructuralEvent::Floated,
        StructuralEvent::Unfloated,
        StructuralEvent::PageCreated,
        StructuralEvent::PageRecycled,
        StructuralEvent::ArchetypeCreated,
    ];

    #[inline]
    pub fn position(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            StructuralEvent::EntityCreated => "entity_created",
            StructuralEvent::EntityDestroyed => "entity_destroyed",
            StructuralEvent::Floated => "floated",
            StructuralEvent::Unfloated => "unfloated",
            StructuralEvent::PageCreated => "page_created",
            StructuralEvent::PageRecycled => "page_recycled",
            StructuralEvent::ArchetypeCreated => "archetype_created",
        }
    }
}

/// Work done by one pass over the store.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassCount {
    pub pages: usize,
    pub entities: usize,
}

impl PassCount {
    #[inline]
    pub fn add_page(&mut self, entities: usize) {
        self.pages += 1;
        self.entities += entities;
    }
}

// ============================================================================
// Macros
// ============================================================================

/// Time a block returning `Result<PassCount, _>` with a [`PassTimer`]. Failed
/// passes are not recorded. Zero-cost when metrics are disabled.
#[macro_export]
macro_rules! time_pass {
    ($timer:expr, $body:block) => {{
        $timer.begin();
        let result = $body;
        if let Ok(count) = &result {
            $timer.end(*count);
        }
        result
    }};
}

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default, Clone)]
pub struct StructuralCounters;

#[cfg(not(feature = "metrics"))]
impl StructuralCounters {
    pub fn new() -> Self { Self }
    pub fn record(&mut self, _event: StructuralEvent) {}
    pub fn get(&self, _event: StructuralEvent) -> u64 { 0 }
    pub fn reset(&mut self) {}
    pub fn iter(&self) -> impl Iterator<Item = (StructuralEvent, u64)> + '_ { std::iter::empty() }
}

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default, Clone)]
pub struct PassTimer;

#[cfg(not(feature = "metrics"))]
impl PassTimer {
    pub fn new() -> Self { Self }
    pub fn begin(&mut self) {}
    pub fn end(&mut self, _count: PassCount) {}
    pub fn passes(&self) -> u64 { 0 }
    pub fn visited(&self) -> PassCount { PassCount::default() }
    pub fn mean_ms(&self) -> f64 { 0.0 }
    pub fn range_ms(&self) -> (f64, f64) { (0.0, 0.0) }
    pub fn entities_per_page(&self) -> f64 { 0.0 }
    pub fn entities_per_second(&self) -> f64 { 0.0 }
}
