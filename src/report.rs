use serde::Serialize;

/// Per-kind counters for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BlendCounts {
    /// Entities captured into a new generation (non-zero only on the first accepted frame of a tick).
    pub captured: u32,
    pub blended: u32,
    pub skipped: u32,
    pub restored: u32,
}

impl BlendCounts {
    pub fn is_empty(&self) -> bool {
        self.captured == 0 && self.blended == 0 && self.skipped == 0 && self.restored == 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FrameReport {
    pub frame: u64,
    pub tick: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f32>,
    /// Wall-clock cost of the blend and restore passes, summed over every kind.
    pub before_ms: f32,
    pub after_ms: f32,
    pub camera: BlendCounts,
    pub view_model: BlendCounts,
    pub objects: BlendCounts,
    pub particles: BlendCounts,
    pub lights: BlendCounts,
    pub flags: BlendCounts,
    pub antennas: BlendCounts,
}

impl FrameReport {
    pub fn total_blended(&self) -> u32 {
        self.kinds().iter().map(|counts| counts.blended).sum()
    }

    pub fn total_restored(&self) -> u32 {
        self.kinds().iter().map(|counts| counts.restored).sum()
    }

    fn kinds(&self) -> [BlendCounts; 7] {
        [self.camera, self.view_model, self.objects, self.particles, self.lights, self.flags, self.antennas]
    }
}
