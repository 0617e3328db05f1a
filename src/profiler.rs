use serde::Serialize;
use std::time::Instant;

/// Which half of the frame window a timing sample belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Before,
    After,
}

impl Phase {
    const ALL: [Phase; 2] = [Phase::Before, Phase::After];

    fn index(self) -> usize {
        match self {
            Phase::Before => 0,
            Phase::After => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct PhaseTimingSummary {
    pub kind: &'static str,
    pub phase: Phase,
    pub last_ms: f32,
    pub average_ms: f32,
    pub max_ms: f32,
    pub samples: u64,
}

#[derive(Clone, Copy, Default)]
struct PhaseStats {
    last_ms: f32,
    total_ms: f32,
    max_ms: f32,
    samples: u64,
}

impl PhaseStats {
    fn push(&mut self, ms: f32) {
        self.last_ms = ms;
        self.max_ms = self.max_ms.max(ms);
        self.total_ms += ms;
        self.samples += 1;
    }

    fn summary(&self, kind: &'static str, phase: Phase) -> Option<PhaseTimingSummary> {
        (self.samples > 0).then(|| PhaseTimingSummary {
            kind,
            phase,
            last_ms: self.last_ms,
            average_ms: self.total_ms / self.samples as f32,
            max_ms: self.max_ms,
            samples: self.samples,
        })
    }
}

/// Wall-clock cost of each entity kind's frame passes.
///
/// Kinds are listed in the order they were first measured, which is the coordinator's pass order.
#[derive(Default)]
pub struct PhaseProfiler {
    kinds: Vec<(&'static str, [PhaseStats; 2])>,
}

impl PhaseProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `pass`, charging its cost to `kind`'s `phase`. Returns the pass result and the cost in ms.
    pub fn measure<T>(&mut self, kind: &'static str, phase: Phase, pass: impl FnOnce() -> T) -> (T, f32) {
        let start = Instant::now();
        let result = pass();
        let elapsed_ms = start.elapsed().as_secs_f32() * 1000.0;
        self.stats_mut(kind)[phase.index()].push(elapsed_ms);
        (result, elapsed_ms)
    }

    fn stats_mut(&mut self, kind: &'static str) -> &mut [PhaseStats; 2] {
        let index = match self.kinds.iter().position(|(known, _)| *known == kind) {
            Some(index) => index,
            None => {
                self.kinds.push((kind, [PhaseStats::default(); 2]));
                self.kinds.len() - 1
            }
        };
        &mut self.kinds[index].1
    }

    pub fn summaries(&self) -> Vec<PhaseTimingSummary> {
        self.kinds
            .iter()
            .flat_map(|&(kind, stats)| {
                Phase::ALL.into_iter().filter_map(move |phase| stats[phase.index()].summary(kind, phase))
            })
            .collect()
    }

    pub fn reset(&mut self) {
        self.kinds.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_accumulate_per_kind_and_phase() {
        let mut profiler = PhaseProfiler::new();
        for _ in 0..3 {
            let (value, elapsed_ms) = profiler.measure("objects", Phase::Before, || 7);
            assert_eq!(value, 7);
            assert!(elapsed_ms >= 0.0);
        }
        profiler.measure("objects", Phase::After, || ());
        profiler.measure("camera", Phase::Before, || ());

        let summaries = profiler.summaries();
        let order: Vec<_> = summaries.iter().map(|s| (s.kind, s.phase)).collect();
        assert_eq!(order, [("objects", Phase::Before), ("objects", Phase::After), ("camera", Phase::Before)]);
        assert_eq!(summaries[0].samples, 3);
        assert!(summaries[0].max_ms >= summaries[0].last_ms);

        profiler.reset();
        assert!(profiler.summaries().is_empty());
    }

    #[test]
    fn phase_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Phase::After).unwrap(), "\"after\"");
    }
}
