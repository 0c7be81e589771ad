use std::time::Duration;

/// Per-step narrow-phase counters, reset at the start of every `process_pairs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NarrowPhaseProfiler {
    pub detection_time: Duration,
    pub pairs_tested: usize,
    pub touching_manifolds: usize,
    pub contact_count: usize,
}

impl NarrowPhaseProfiler {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn report(&self) {
        if self.pairs_tested == 0 {
            return;
        }

        log::info!(
            "narrowphase: {} pairs, {} touching, {} contacts in {:.3} ms",
            self.pairs_tested,
            self.touching_manifolds,
            self.contact_count,
            self.detection_time.as_secs_f32() * 1000.0
        );
    }
}
