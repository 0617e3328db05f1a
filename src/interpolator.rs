//! Lifecycle coordinator.
//!
//! The host drives one [`Interpolator`] with a fixed cadence: `on_tick` after every simulation step,
//! `before_frame` right before render submission and `after_frame` right after it. `on_reset` drops all
//! history, e.g. when a level is loaded, after restoring anything still blended. Everything blended in `before_frame` is written back to its
//! authoritative value by the matching `after_frame`.

use crate::camera::CameraInterpolator;
use crate::chain::ChainInterpolator;
use crate::config::InterpolationConfig;
use crate::host::{ChainKind, SimulationHost};
use crate::light::LightInterpolator;
use crate::object::ObjectInterpolator;
use crate::particle::ParticleInterpolator;
use crate::profiler::{Phase, PhaseProfiler};
use crate::progress::ProgressClock;
use crate::report::{BlendCounts, FrameReport};
use crate::view_model::ViewModelInterpolator;

/// Host-independent half of an entity-kind module.
pub trait EntityInterpolator {
    fn label(&self) -> &'static str;

    /// Marks a generation rollover. The rotation and capture happen on the next accepted frame.
    fn on_tick(&mut self);

    /// Drops every generation; the module behaves as freshly constructed.
    fn clear(&mut self);
}

/// Frame window of an entity-kind module against a host exposing `H`'s accessors.
pub trait FramePass<H: ?Sized>: EntityInterpolator {
    /// Captures a new generation if a rollover is pending, then writes blended values into live state.
    fn before_frame(&mut self, host: &mut H, alpha: f32) -> BlendCounts;

    /// Restores every entity touched by the preceding `before_frame`. Returns how many were restored.
    fn after_frame(&mut self, host: &mut H) -> u32;
}

pub struct Interpolator {
    config: InterpolationConfig,
    enabled: bool,
    /// Set by re-enabling; history is dropped before the next tick or frame touches it.
    reset_pending: bool,
    progress: ProgressClock,
    camera: CameraInterpolator,
    view_model: ViewModelInterpolator,
    objects: ObjectInterpolator,
    particles: ParticleInterpolator,
    lights: LightInterpolator,
    flags: ChainInterpolator,
    antennas: ChainInterpolator,
    profiler: PhaseProfiler,
    ticks: u64,
    frames: u64,
    report: FrameReport,
}

fn run_before<H, M>(
    module: &mut M,
    enabled: bool,
    profiler: &mut PhaseProfiler,
    host: &mut H,
    alpha: f32,
    spent_ms: &mut f32,
) -> BlendCounts
where
    H: ?Sized,
    M: FramePass<H>,
{
    if !enabled {
        return BlendCounts::default();
    }
    let (counts, elapsed_ms) = profiler.measure(module.label(), Phase::Before, || module.before_frame(host, alpha));
    *spent_ms += elapsed_ms;
    counts
}

fn run_after<H, M>(
    module: &mut M,
    enabled: bool,
    profiler: &mut PhaseProfiler,
    host: &mut H,
    counts: &mut BlendCounts,
    spent_ms: &mut f32,
) where
    H: ?Sized,
    M: FramePass<H>,
{
    if !enabled {
        return;
    }
    let (restored, elapsed_ms) = profiler.measure(module.label(), Phase::After, || module.after_frame(host));
    counts.restored = restored;
    *spent_ms += elapsed_ms;
}

impl Interpolator {
    pub fn new(config: InterpolationConfig) -> Self {
        log::debug!(
            "interpolator: objects={} particles={} lights={} deadband={} delay={}",
            config.objects.capacity,
            config.particles.capacity,
            config.lights.capacity,
            config.progress.deadband,
            config.progress.delay
        );
        Self {
            enabled: config.enabled,
            reset_pending: false,
            progress: ProgressClock::new(&config.progress),
            camera: CameraInterpolator::new(&config.camera),
            view_model: ViewModelInterpolator::new(&config.view_model),
            objects: ObjectInterpolator::new(&config.objects),
            particles: ParticleInterpolator::new(&config.particles),
            lights: LightInterpolator::new(&config.lights),
            flags: ChainInterpolator::new(ChainKind::Flag, &config.flags),
            antennas: ChainInterpolator::new(ChainKind::Antenna, &config.antennas),
            profiler: PhaseProfiler::new(),
            ticks: 0,
            frames: 0,
            report: FrameReport::default(),
            config,
        }
    }

    fn modules_mut(&mut self) -> [&mut dyn EntityInterpolator; 7] {
        [
            &mut self.camera,
            &mut self.view_model,
            &mut self.objects,
            &mut self.particles,
            &mut self.lights,
            &mut self.flags,
            &mut self.antennas,
        ]
    }

    /// Called once after every simulation step.
    pub fn on_tick<H: SimulationHost + ?Sized>(&mut self, host: &mut H) {
        let rate = host.effective_tick_rate();
        if host.first_person_tick_rate() != rate {
            host.set_first_person_tick_rate(rate);
        }
        if !self.enabled || host.is_paused() {
            return;
        }
        self.apply_pending_reset();
        self.ticks += 1;
        self.progress.on_tick();
        for module in self.modules_mut() {
            module.on_tick();
        }
    }

    /// Blends every eligible entity into live state for the coming frame.
    ///
    /// Returns the frame's report; `alpha` is `None` when the frame was not interpolated (disabled,
    /// paused, or the raw progress fell inside the deadband).
    pub fn before_frame<H: SimulationHost + ?Sized>(&mut self, host: &mut H) -> FrameReport {
        self.frames += 1;
        self.report = FrameReport { frame: self.frames, tick: self.ticks, ..FrameReport::default() };
        if !self.enabled {
            return self.report;
        }
        self.apply_pending_reset();
        let Some(alpha) = self.progress.on_pre_frame(host.tick_progress(), host.is_paused()) else {
            log::trace!("frame {}: progress {} not accepted", self.frames, host.tick_progress());
            return self.report;
        };

        let cfg = &self.config;
        let profiler = &mut self.profiler;
        let report = &mut self.report;
        let spent = &mut report.before_ms;
        let camera = run_before(&mut self.camera, cfg.camera.enabled, profiler, host, alpha, spent);
        let view_model = run_before(&mut self.view_model, cfg.view_model.enabled, profiler, host, alpha, spent);
        let objects = run_before(&mut self.objects, cfg.objects.enabled, profiler, host, alpha, spent);
        let particles = run_before(&mut self.particles, cfg.particles.enabled, profiler, host, alpha, spent);
        let lights = run_before(&mut self.lights, cfg.lights.enabled, profiler, host, alpha, spent);
        let flags = run_before(&mut self.flags, cfg.flags.enabled, profiler, host, alpha, spent);
        let antennas = run_before(&mut self.antennas, cfg.antennas.enabled, profiler, host, alpha, spent);
        report.alpha = Some(alpha);
        report.camera = camera;
        report.view_model = view_model;
        report.objects = objects;
        report.particles = particles;
        report.lights = lights;
        report.flags = flags;
        report.antennas = antennas;
        log::trace!("frame {}: alpha {alpha:.4}, {} blended", self.frames, report.total_blended());
        *report
    }

    /// Writes authoritative values back over everything `before_frame` blended, in reverse module order.
    ///
    /// Runs regardless of the enabled and paused state; with nothing touched it does no work.
    pub fn after_frame<H: SimulationHost + ?Sized>(&mut self, host: &mut H) -> FrameReport {
        let cfg = &self.config;
        let profiler = &mut self.profiler;
        let report = &mut self.report;
        let spent = &mut report.after_ms;
        *spent = 0.0;
        run_after(&mut self.antennas, cfg.antennas.enabled, profiler, host, &mut report.antennas, spent);
        run_after(&mut self.flags, cfg.flags.enabled, profiler, host, &mut report.flags, spent);
        run_after(&mut self.lights, cfg.lights.enabled, profiler, host, &mut report.lights, spent);
        run_after(&mut self.particles, cfg.particles.enabled, profiler, host, &mut report.particles, spent);
        run_after(&mut self.objects, cfg.objects.enabled, profiler, host, &mut report.objects, spent);
        run_after(&mut self.view_model, cfg.view_model.enabled, profiler, host, &mut report.view_model, spent);
        run_after(&mut self.camera, cfg.camera.enabled, profiler, host, &mut report.camera, spent);
        *report
    }

    /// Drops all history; the next captured generation is never blended against data from before.
    ///
    /// A reset inside the frame window first restores everything the open `before_frame` blended, so the
    /// host never keeps presentation values.
    pub fn on_reset<H: SimulationHost + ?Sized>(&mut self, host: &mut H) {
        log::debug!("interpolator: reset after {} ticks", self.ticks);
        self.after_frame(host);
        self.clear_history();
    }

    fn clear_history(&mut self) {
        self.reset_pending = false;
        self.progress.clear();
        for module in self.modules_mut() {
            module.clear();
        }
    }

    fn apply_pending_reset(&mut self) {
        if self.reset_pending {
            self.clear_history();
        }
    }

    /// Re-enabling drops the history collected before interpolation was turned off. The drop is deferred
    /// to the next tick or frame so a window that is still open gets restored by its `after_frame`.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled == self.enabled {
            return;
        }
        log::debug!("interpolator: {}", if enabled { "enabled" } else { "disabled" });
        if enabled {
            self.reset_pending = true;
        }
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Alpha accepted for the current tick.
    pub fn tick_progress(&self) -> f32 {
        self.progress.tick_progress()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn config(&self) -> &InterpolationConfig {
        &self.config
    }

    pub fn profiler(&self) -> &PhaseProfiler {
        &self.profiler
    }

    pub fn camera(&self) -> &CameraInterpolator {
        &self.camera
    }

    pub fn view_model(&self) -> &ViewModelInterpolator {
        &self.view_model
    }

    pub fn objects(&self) -> &ObjectInterpolator {
        &self.objects
    }

    pub fn particles(&self) -> &ParticleInterpolator {
        &self.particles
    }

    pub fn lights(&self) -> &LightInterpolator {
        &self.lights
    }

    pub fn chains(&self, kind: ChainKind) -> &ChainInterpolator {
        match kind {
            ChainKind::Flag => &self.flags,
            ChainKind::Antenna => &self.antennas,
        }
    }
}
