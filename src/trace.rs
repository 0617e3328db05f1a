//! Synthetic frame-pacing scenario.
//!
//! Runs a `SandboxWorld` at a fixed tick rate while frames arrive at a different, optionally jittered,
//! rate. Every frame is blended, "rendered" and restored, and the restored world is compared with a
//! snapshot taken before blending. Any difference aborts the run.

use crate::config::InterpolationConfig;
use crate::host::{CameraMode, ChainKind, ModelNode, ObjectKind, PlayerBody, TagId};
use crate::interpolator::Interpolator;
use crate::math::squared_distance;
use crate::profiler::PhaseTimingSummary;
use crate::sandbox::SandboxWorld;
use anyhow::{ensure, Context, Result};
use glam::{Quat, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::f32::consts::TAU;
use std::io::{self, Write};

const ORBITERS: usize = 6;
const ORBIT_RADIUS: f32 = 3.0;
const ORBIT_SPEED: f32 = 1.5;
const VEHICLE_SPEED: f32 = 4.0;
const TELEPORT_EVERY: u32 = 45;
const TELEPORT_DISTANCE: f32 = 20.0;
const PARTICLES_PER_TICK: usize = 2;
const PARTICLE_LIFETIME: u32 = 20;
const SKELETON_NODES: usize = 4;

#[derive(Debug, Clone)]
pub struct TraceOptions {
    pub config: InterpolationConfig,
    pub ticks: u32,
    pub tick_rate: f32,
    pub fps: f32,
    /// Maximum relative deviation of each frame's duration, in [0,1).
    pub jitter: f32,
    pub seed: u64,
    pub emit_reports: bool,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            config: InterpolationConfig::default(),
            ticks: 300,
            tick_rate: 30.0,
            fps: 144.0,
            jitter: 0.1,
            seed: 7,
            emit_reports: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TraceSummary {
    pub ticks: u32,
    pub frames: u64,
    pub interpolated_frames: u64,
    pub rejected_frames: u64,
    pub blended: u64,
    pub restored: u64,
    /// Largest per-frame movement of the vehicle as presented, and as simulated.
    pub max_rendered_step: f32,
    pub max_authoritative_step: f32,
    pub timings: Vec<PhaseTimingSummary>,
}

struct LiveParticle {
    slot: usize,
    born: u32,
    velocity: Vec3,
}

/// Slots of the scripted entities and the state driving them.
struct Scenario {
    orbiters: Vec<usize>,
    teleporter: usize,
    vehicle: usize,
    rider: usize,
    device: usize,
    light: usize,
    flag: usize,
    antenna: usize,
    particles: Vec<LiveParticle>,
    device_position: f32,
}

fn skeleton(phase: f32) -> Vec<ModelNode> {
    (0..SKELETON_NODES)
        .map(|index| {
            let angle = phase + index as f32 * 0.3;
            ModelNode::new(Quat::from_rotation_z(angle), Vec3::new(0.0, 0.0, index as f32 * 0.5), 1.0)
        })
        .collect()
}

impl Scenario {
    fn spawn(world: &mut SandboxWorld) -> Self {
        let orbiters = (0..ORBITERS)
            .map(|index| {
                let slot = world.spawn_object(ObjectKind::Scenery, TagId(10), orbit_point(index, 0.0), None);
                if let Some(object) = world.object_entry_mut(slot) {
                    object.nodes = skeleton(0.0);
                }
                slot
            })
            .collect();
        let teleporter = world.spawn_object(ObjectKind::Projectile, TagId(20), Vec3::new(-5.0, 0.0, 0.0), None);
        let vehicle = world.spawn_object(ObjectKind::Vehicle, TagId(30), Vec3::ZERO, None);
        let rider = world.spawn_object(ObjectKind::Biped, TagId(40), Vec3::ZERO, Some(vehicle));
        if let Some(object) = world.object_entry_mut(rider) {
            object.local_player = true;
            object.nodes = skeleton(0.0);
        }
        let device = world.spawn_object(ObjectKind::DeviceMachine, TagId(50), Vec3::new(0.0, 6.0, 0.0), None);
        let light = world.spawn_light(Vec3::new(0.0, 0.0, 4.0), [Vec3::X, Vec3::Z]);
        let flag = world.spawn_chain(ChainKind::Flag, vec![Vec3::ZERO, Vec3::Z, Vec3::new(0.0, 0.0, 2.0)]);
        let antenna = world.spawn_chain(ChainKind::Antenna, vec![Vec3::ZERO, Vec3::new(0.0, 0.0, 0.8)]);

        world.camera_mode = CameraMode::FirstPerson;
        world.followed = world.object_id(rider);
        world.player = Some(PlayerBody { attached: true, health: 1.0 });
        world.view_model_active = true;
        world.held_item = 1;
        world.view_model = skeleton(0.0);

        Self {
            orbiters,
            teleporter,
            vehicle,
            rider,
            device,
            light,
            flag,
            antenna,
            particles: Vec::new(),
            device_position: 0.0,
        }
    }

    /// One simulation step at `tick`, `dt` seconds long.
    fn advance(&mut self, world: &mut SandboxWorld, tick: u32, dt: f32, rng: &mut StdRng) {
        let time = tick as f32 * dt;
        for (index, &slot) in self.orbiters.iter().enumerate() {
            world.move_object(slot, orbit_point(index, time));
            if let Some(object) = world.object_entry_mut(slot) {
                object.nodes = skeleton(time);
            }
        }

        if tick % TELEPORT_EVERY == 0 {
            let center = world.object_center(self.teleporter).unwrap_or_default();
            world.move_object(self.teleporter, center + Vec3::new(TELEPORT_DISTANCE, 0.0, 0.0));
        }

        let vehicle_position = Vec3::new(time * VEHICLE_SPEED, 0.0, 0.0);
        let vehicle_step = Vec3::new(dt * VEHICLE_SPEED, 0.0, 0.0);
        world.move_object(self.vehicle, vehicle_position);
        world.move_object(self.rider, vehicle_position + Vec3::Z);
        if let Some(object) = world.object_entry_mut(self.rider) {
            object.nodes = skeleton(time * 2.0);
        }
        world.translate_chain(ChainKind::Flag, self.flag, vehicle_step);
        world.translate_chain(ChainKind::Antenna, self.antenna, Vec3::new(0.0, (time * 3.0).sin() * 0.01, 0.0));

        self.device_position = (self.device_position + 0.05) % 1.0;
        if let Some(object) = world.object_entry_mut(self.device) {
            object.device_position = Some(self.device_position);
            object.center.z = self.device_position * 2.0;
        }

        let (sin, cos) = (time * ORBIT_SPEED).sin_cos();
        world.update_light(self.light, Vec3::new(cos * 2.0, sin * 2.0, 4.0), [Vec3::new(cos, sin, 0.0), Vec3::Z]);

        world.camera.position = vehicle_position + Vec3::new(0.0, 0.0, 1.5);
        world.camera.forward = Quat::from_rotation_z((time * 0.5).sin() * 0.2) * Vec3::X;
        world.view_model = skeleton(time * 4.0);

        self.particles.retain(|particle| {
            let alive = tick - particle.born < PARTICLE_LIFETIME;
            if !alive {
                world.despawn_particle(particle.slot);
            }
            alive
        });
        for particle in &self.particles {
            let position = world.particle_position(particle.slot).unwrap_or_default();
            world.move_particle(particle.slot, position + particle.velocity * dt);
        }
        for _ in 0..PARTICLES_PER_TICK {
            let velocity = Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(1.0..3.0));
            let slot = world.spawn_particle(vehicle_position);
            self.particles.push(LiveParticle { slot, born: tick, velocity });
        }
    }
}

fn orbit_point(index: usize, time: f32) -> Vec3 {
    let angle = index as f32 / ORBITERS as f32 * TAU + time * ORBIT_SPEED;
    Vec3::new(angle.cos() * ORBIT_RADIUS, angle.sin() * ORBIT_RADIUS, 0.0)
}

/// Runs the scenario, writing one JSON frame report per line to stdout when `emit_reports` is set.
pub fn run_trace(options: &TraceOptions) -> Result<TraceSummary> {
    if options.emit_reports {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        run_trace_to(options, &mut out)
    } else {
        run_trace_to(options, &mut io::sink())
    }
}

pub fn run_trace_to(options: &TraceOptions, out: &mut dyn Write) -> Result<TraceSummary> {
    ensure!(options.tick_rate > 0.0, "tick rate must be positive, got {}", options.tick_rate);
    ensure!(options.fps > 0.0, "frame rate must be positive, got {}", options.fps);
    ensure!((0.0..1.0).contains(&options.jitter), "jitter must be in [0,1), got {}", options.jitter);

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut world = SandboxWorld::new();
    world.set_tick_rate(options.tick_rate);
    let mut scenario = Scenario::spawn(&mut world);
    let mut interp = Interpolator::new(options.config.clone());
    log::info!(
        "trace: {} ticks at {} Hz, {} fps, jitter {}, seed {}",
        options.ticks,
        options.tick_rate,
        options.fps,
        options.jitter,
        options.seed
    );

    let tick_dt = 1.0 / f64::from(options.tick_rate);
    let frame_dt = 1.0 / f64::from(options.fps);
    let mut accumulator = 0.0f64;
    let mut tick = 0u32;
    let mut summary = TraceSummary::default();
    let mut last_rendered: Option<Vec3> = None;
    let mut last_authoritative: Option<Vec3> = None;

    while tick < options.ticks {
        let stretch = if options.jitter > 0.0 { rng.gen_range(-options.jitter..options.jitter) } else { 0.0 };
        accumulator += frame_dt * f64::from(1.0 + stretch);
        while accumulator >= tick_dt && tick < options.ticks {
            accumulator -= tick_dt;
            tick += 1;
            scenario.advance(&mut world, tick, tick_dt as f32, &mut rng);
            interp.on_tick(&mut world);
        }

        world.set_progress((accumulator / tick_dt) as f32);
        let snapshot = world.clone();
        interp.before_frame(&mut world);
        let rendered = world.object_center(scenario.vehicle).unwrap_or_default();
        let report = interp.after_frame(&mut world);
        ensure!(
            world == snapshot,
            "frame {}: live state differs from the simulation after restore",
            report.frame
        );

        let authoritative = world.object_center(scenario.vehicle).unwrap_or_default();
        if let Some(previous) = last_rendered {
            summary.max_rendered_step = summary.max_rendered_step.max(squared_distance(previous, rendered).sqrt());
        }
        if let Some(previous) = last_authoritative {
            summary.max_authoritative_step =
                summary.max_authoritative_step.max(squared_distance(previous, authoritative).sqrt());
        }
        last_rendered = Some(rendered);
        last_authoritative = Some(authoritative);

        summary.frames += 1;
        if report.alpha.is_some() {
            summary.interpolated_frames += 1;
        } else {
            summary.rejected_frames += 1;
        }
        summary.blended += u64::from(report.total_blended());
        summary.restored += u64::from(report.total_restored());
        serde_json::to_writer(&mut *out, &report).context("Failed to serialize frame report")?;
        writeln!(out).context("Failed to write frame report")?;
    }

    summary.ticks = tick;
    summary.timings = interp.profiler().summaries();
    log::info!(
        "trace: {} frames ({} interpolated, {} rejected), {} blends restored",
        summary.frames,
        summary.interpolated_frames,
        summary.rejected_frames,
        summary.restored
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet(ticks: u32) -> TraceOptions {
        TraceOptions { ticks, emit_reports: false, ..TraceOptions::default() }
    }

    #[test]
    fn trace_restores_every_frame() {
        let summary = run_trace(&quiet(120)).unwrap();
        assert_eq!(summary.ticks, 120);
        assert!(summary.frames > 120 * 4);
        assert!(summary.interpolated_frames > 0);
        assert_eq!(summary.blended, summary.restored);
        assert!(summary.max_authoritative_step > 0.0);
        assert!(summary.max_rendered_step <= summary.max_authoritative_step * 1.5);
    }

    #[test]
    fn reports_are_json_lines() {
        let mut out = Vec::new();
        let summary = run_trace_to(&quiet(10), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count() as u64, summary.frames);
        let first: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert!(first.get("objects").is_some());
    }

    #[test]
    fn disabled_interpolation_blends_nothing() {
        let mut options = quiet(30);
        options.config.enabled = false;
        let summary = run_trace(&options).unwrap();
        assert_eq!(summary.blended, 0);
        assert_eq!(summary.interpolated_frames, 0);
    }

    #[test]
    fn invalid_rates_are_rejected() {
        let options = TraceOptions { fps: 0.0, ..quiet(1) };
        let err = run_trace(&options).unwrap_err();
        assert!(err.to_string().contains("frame rate"));
    }
}
