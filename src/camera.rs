use crate::config::CameraConfig;
use crate::generation::GenerationRing;
use crate::host::{CameraHost, CameraMode, CameraState, EntityId};
use crate::interpolator::{EntityInterpolator, FramePass};
use crate::math::{catmull_rom_point, lerp_point, squared_distance};
use crate::report::BlendCounts;
use glam::Vec3;

#[derive(Debug, Clone, Copy, Default)]
struct CameraSnapshot {
    valid: bool,
    mode: CameraMode,
    followed: Option<EntityId>,
    state: CameraState,
}

impl CameraSnapshot {
    fn continues(&self, newer: &CameraSnapshot, teleport_distance_squared: f32) -> bool {
        self.valid
            && newer.valid
            && self.mode == newer.mode
            && self.followed == newer.followed
            && squared_distance(self.state.position, newer.state.position) <= teleport_distance_squared
    }
}

/// Why the viewpoint snaps to the authoritative value for a whole tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraSkip {
    NoHistory,
    CinematicWithoutTarget,
    ModeChanged,
    FollowedChanged,
    Teleport,
}

/// Viewpoint smoothing over three generations.
///
/// Position and the two basis vectors follow a Catmull-Rom segment from the previous to the current
/// generation, with the generation before that as the leading control point and the current one repeated
/// as the trailing point (there is no look-ahead). When the oldest generation does not continue into the
/// previous one the segment degrades to a linear blend.
pub struct CameraInterpolator {
    generations: GenerationRing<CameraSnapshot, 3>,
    teleport_distance_squared: f32,
    skip: Option<CameraSkip>,
    position_applied: bool,
    orientation_applied: bool,
}

impl CameraInterpolator {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            generations: GenerationRing::from_fn(|_| CameraSnapshot::default()),
            teleport_distance_squared: config.teleport_distance_squared,
            skip: Some(CameraSkip::NoHistory),
            position_applied: false,
            orientation_applied: false,
        }
    }

    /// Reason the current tick is not interpolated, if any.
    pub fn skip_reason(&self) -> Option<CameraSkip> {
        self.skip
    }

    fn evaluate_skip(&self) -> Option<CameraSkip> {
        let current = self.generations.current();
        let previous = self.generations.previous();
        if current.mode == CameraMode::Cinematic && current.followed.is_none() {
            return Some(CameraSkip::CinematicWithoutTarget);
        }
        if !previous.valid {
            return Some(CameraSkip::NoHistory);
        }
        if current.mode != previous.mode {
            return Some(CameraSkip::ModeChanged);
        }
        if current.followed != previous.followed {
            return Some(CameraSkip::FollowedChanged);
        }
        if squared_distance(previous.state.position, current.state.position) > self.teleport_distance_squared {
            return Some(CameraSkip::Teleport);
        }
        None
    }

    fn capture<H: CameraHost + ?Sized>(&mut self, host: &mut H) {
        let snapshot = CameraSnapshot {
            valid: true,
            mode: host.camera_mode(),
            followed: host.followed_entity(),
            state: *host.camera_mut(),
        };
        *self.generations.current_mut() = snapshot;
        self.skip = self.evaluate_skip();
        if let Some(reason) = self.skip {
            log::debug!("camera: snapping for this tick ({reason:?})");
        }
    }
}

/// Blend between the previous and current generation, with `lead` as the leading control point when the
/// history reaches back that far.
fn blend_point(lead: Option<Vec3>, p1: Vec3, p2: Vec3, alpha: f32) -> Vec3 {
    match lead {
        Some(p0) => catmull_rom_point(p0, p1, p2, p2, alpha),
        None => lerp_point(p1, p2, alpha),
    }
}

fn blend_direction(lead: Option<Vec3>, p1: Vec3, p2: Vec3, alpha: f32) -> Vec3 {
    blend_point(lead, p1, p2, alpha).try_normalize().unwrap_or(p2)
}

impl EntityInterpolator for CameraInterpolator {
    fn label(&self) -> &'static str {
        "camera"
    }

    fn on_tick(&mut self) {
        self.generations.mark_rollover();
    }

    fn clear(&mut self) {
        self.generations.reset(|snapshot| *snapshot = CameraSnapshot::default());
        self.skip = Some(CameraSkip::NoHistory);
        self.position_applied = false;
        self.orientation_applied = false;
    }
}

impl<H: CameraHost + ?Sized> FramePass<H> for CameraInterpolator {
    fn before_frame(&mut self, host: &mut H, alpha: f32) -> BlendCounts {
        let mut counts = BlendCounts::default();
        if self.generations.take_rollover() {
            self.capture(host);
            counts.captured = 1;
        }
        if self.skip.is_some() {
            counts.skipped = 1;
            return counts;
        }

        let current = *self.generations.current();
        let previous = *self.generations.previous();
        let older = *self.generations.back(2);

        let body = host.local_player_body();
        if current.mode == CameraMode::Debug && body.is_some_and(|body| body.health >= 0.0) {
            counts.skipped = 1;
            return counts;
        }
        let smooth_orientation = current.mode != CameraMode::FirstPerson
            || body.is_some_and(|body| body.attached)
            || host.spectating();

        let lead = older.continues(&previous, self.teleport_distance_squared).then_some(older.state);
        let (p1, p2) = (previous.state, current.state);

        let camera = host.camera_mut();
        camera.position = blend_point(lead.map(|p0| p0.position), p1.position, p2.position, alpha);
        self.position_applied = true;
        if smooth_orientation {
            camera.forward = blend_direction(lead.map(|p0| p0.forward), p1.forward, p2.forward, alpha);
            camera.up = blend_direction(lead.map(|p0| p0.up), p1.up, p2.up, alpha);
            self.orientation_applied = true;
        }
        counts.blended = 1;
        counts
    }

    fn after_frame(&mut self, host: &mut H) -> u32 {
        if !self.position_applied && !self.orientation_applied {
            return 0;
        }
        let authoritative = self.generations.current().state;
        let camera = host.camera_mut();
        if self.position_applied {
            camera.position = authoritative.position;
        }
        if self.orientation_applied {
            camera.forward = authoritative.forward;
            camera.up = authoritative.up;
        }
        self.position_applied = false;
        self.orientation_applied = false;
        1
    }
}
