//! Per-store counters for structural changes

use crate::StructuralEvent;

#[derive(Debug, Default, Clone)]
pub struct StructuralCounters {
    counts: [u64; StructuralEvent::ALL.len()],
}

impl StructuralCounters {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record(&mut self, event: StructuralEvent) {
        self.counts[event.position()] += 1;
    }

    pub fn get(&self, event: StructuralEvent) -> u64 {
        self.counts[event.position()]
    }

    pub fn reset(&mut self) {
        self.counts = [0; StructuralEvent::ALL.len()];
    }

    pub fn iter(&self) -> impl Iterator<Item = (StructuralEvent, u64)> + '_ {
        StructuralEvent::ALL
            .iter()
            .map(move |&event| (event, self.get(event)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_resets() {
        let mut counters = StructuralCounters::new();
        counters.record(StructuralEvent::PageCreated);
        counters.record(StructuralEvent::PageCreated);
        counters.record(StructuralEvent::Floated);

        assert_eq!(counters.get(StructuralEvent::PageCreated), 2);
        assert_eq!(counters.get(StructuralEvent::Floated), 1);
        assert_eq!(counters.get(StructuralEvent::Unfloated), 0);
        assert_eq!(counters.iter().map(|(_, n)| n).sum::<u64>(), 3);

        counters.reset();
        assert_eq!(counters.get(StructuralEvent::PageCreated), 0);
    }
}
