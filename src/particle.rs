use crate::config::ParticleConfig;
use crate::generation::GenerationRing;
use crate::host::{EntityId, ParticleHost};
use crate::interpolator::{EntityInterpolator, FramePass};
use crate::math::lerp_point;
use crate::report::BlendCounts;
use glam::Vec3;

#[derive(Debug, Clone, Copy, Default)]
struct ParticleRecord {
    live: bool,
    eligible: bool,
    touched: bool,
    id: EntityId,
    position: Vec3,
}

pub struct ParticleInterpolator {
    generations: GenerationRing<Box<[ParticleRecord]>, 2>,
    capacity: usize,
}

impl ParticleInterpolator {
    pub fn new(config: &ParticleConfig) -> Self {
        let capacity = config.capacity;
        Self {
            generations: GenerationRing::from_fn(|_| vec![ParticleRecord::default(); capacity].into_boxed_slice()),
            capacity,
        }
    }

    pub fn is_eligible(&self, slot: usize) -> bool {
        self.generations.current()[slot].eligible
    }

    fn capture<H: ParticleHost + ?Sized>(&mut self, host: &mut H) -> u32 {
        let slot_count = host.particle_slot_count();
        assert!(
            slot_count <= self.capacity,
            "particle table reports {slot_count} slots but the buffer holds {}",
            self.capacity
        );
        let (current, previous) = self.generations.current_and_previous_mut();
        current.fill(ParticleRecord::default());
        let mut captured = 0;
        for slot in 0..slot_count {
            let Some(view) = host.particle_mut(slot) else {
                continue;
            };
            let prev = &previous[slot];
            // A zero salt marks a slot being recycled; a salt change is a new particle in an old slot.
            let eligible = view.id.salt != 0 && prev.live && prev.id == view.id;
            current[slot] = ParticleRecord {
                live: view.id.salt != 0,
                eligible,
                touched: false,
                id: view.id,
                position: *view.position,
            };
            captured += 1;
        }
        captured
    }
}

impl EntityInterpolator for ParticleInterpolator {
    fn label(&self) -> &'static str {
        "particles"
    }

    fn on_tick(&mut self) {
        self.generations.mark_rollover();
    }

    fn clear(&mut self) {
        self.generations.reset(|records| records.fill(ParticleRecord::default()));
    }
}

impl<H: ParticleHost + ?Sized> FramePass<H> for ParticleInterpolator {
    fn before_frame(&mut self, host: &mut H, alpha: f32) -> BlendCounts {
        let mut counts = BlendCounts::default();
        if self.generations.take_rollover() {
            counts.captured = self.capture(host);
        }
        let slot_count = host.particle_slot_count().min(self.capacity);
        let (current, previous) = self.generations.current_and_previous_mut();
        for slot in 0..slot_count {
            let record = &mut current[slot];
            if !record.eligible {
                continue;
            }
            let Some(view) = host.particle_mut(slot) else {
                counts.skipped += 1;
                continue;
            };
            if view.id != record.id {
                counts.skipped += 1;
                continue;
            }
            *view.position = lerp_point(previous[slot].position, record.position, alpha);
            record.touched = true;
            counts.blended += 1;
        }
        counts
    }

    fn after_frame(&mut self, host: &mut H) -> u32 {
        let current = self.generations.current_mut();
        let mut restored = 0;
        for (slot, record) in current.iter_mut().enumerate() {
            if !record.touched {
                continue;
            }
            record.touched = false;
            let Some(view) = host.particle_mut(slot) else {
                continue;
            };
            if view.id == record.id {
                *view.position = record.position;
                restored += 1;
            }
        }
        restored
    }
}
