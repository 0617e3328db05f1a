use crate::config::LightConfig;
use crate::generation::GenerationRing;
use crate::host::{EntityId, LightHost};
use crate::interpolator::{EntityInterpolator, FramePass};
use crate::math::lerp_point;
use crate::report::BlendCounts;
use glam::Vec3;

#[derive(Debug, Clone, Copy, Default)]
struct LightRecord {
    eligible: bool,
    touched: bool,
    counter: u32,
    id: EntityId,
    position: Vec3,
    orientation: [Vec3; 2],
}

/// Dynamic lights: position and both orientation basis vectors.
///
/// A light is blended only while its liveness counter keeps advancing under the same id. The counter
/// starts from zero whenever the light is recreated, so a light seen for the first time waits a tick.
pub struct LightInterpolator {
    generations: GenerationRing<Box<[LightRecord]>, 2>,
    capacity: usize,
}

impl LightInterpolator {
    pub fn new(config: &LightConfig) -> Self {
        let capacity = config.capacity;
        Self {
            generations: GenerationRing::from_fn(|_| vec![LightRecord::default(); capacity].into_boxed_slice()),
            capacity,
        }
    }

    pub fn is_eligible(&self, slot: usize) -> bool {
        self.generations.current()[slot].eligible
    }

    fn capture<H: LightHost + ?Sized>(&mut self, host: &mut H) -> u32 {
        let slot_count = host.light_slot_count();
        assert!(
            slot_count <= self.capacity,
            "light table reports {slot_count} slots but the buffer holds {}",
            self.capacity
        );
        let (current, previous) = self.generations.current_and_previous_mut();
        current.fill(LightRecord::default());
        let mut captured = 0;
        for slot in 0..slot_count {
            let Some(view) = host.light_mut(slot) else {
                continue;
            };
            let prev = &previous[slot];
            current[slot] = LightRecord {
                eligible: prev.counter != 0 && prev.id == view.id && view.counter > prev.counter,
                touched: false,
                counter: view.counter,
                id: view.id,
                position: *view.position,
                orientation: *view.orientation,
            };
            captured += 1;
        }
        captured
    }
}

impl EntityInterpolator for LightInterpolator {
    fn label(&self) -> &'static str {
        "lights"
    }

    fn on_tick(&mut self) {
        self.generations.mark_rollover();
    }

    fn clear(&mut self) {
        self.generations.reset(|records| records.fill(LightRecord::default()));
    }
}

impl<H: LightHost + ?Sized> FramePass<H> for LightInterpolator {
    fn before_frame(&mut self, host: &mut H, alpha: f32) -> BlendCounts {
        let mut counts = BlendCounts::default();
        if self.generations.take_rollover() {
            counts.captured = self.capture(host);
        }
        let slot_count = host.light_slot_count().min(self.capacity);
        let (current, previous) = self.generations.current_and_previous_mut();
        for slot in 0..slot_count {
            let record = &mut current[slot];
            if !record.eligible {
                continue;
            }
            let Some(view) = host.light_mut(slot) else {
                counts.skipped += 1;
                continue;
            };
            if view.id != record.id {
                counts.skipped += 1;
                continue;
            }
            let prev = &previous[slot];
            *view.position = lerp_point(prev.position, record.position, alpha);
            view.orientation[0] = lerp_point(prev.orientation[0], record.orientation[0], alpha);
            view.orientation[1] = lerp_point(prev.orientation[1], record.orientation[1], alpha);
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
            let Some(view) = host.light_mut(slot) else {
                continue;
            };
            if view.id == record.id {
                *view.position = record.position;
                *view.orientation = record.orientation;
                restored += 1;
            }
        }
        restored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::LightView;

    struct TestLight {
        id: EntityId,
        counter: u32,
        position: Vec3,
        orientation: [Vec3; 2],
    }

    #[derive(Default)]
    struct TestLights {
        slots: Vec<Option<TestLight>>,
    }

    impl LightHost for TestLights {
        fn light_slot_count(&self) -> usize {
            self.slots.len()
        }
        fn light_mut(&mut self, slot: usize) -> Option<LightView<'_>> {
            let light = self.slots.get_mut(slot)?.as_mut()?;
            Some(LightView {
                id: light.id,
                counter: light.counter,
                position: &mut light.position,
                orientation: &mut light.orientation,
            })
        }
    }

    fn light(counter: u32, x: f32) -> Option<TestLight> {
        Some(TestLight {
            id: EntityId::new(0, 2),
            counter,
            position: Vec3::new(x, 0.0, 0.0),
            orientation: [Vec3::X, Vec3::Z],
        })
    }

    fn step(interp: &mut LightInterpolator, host: &mut TestLights, alpha: f32) -> BlendCounts {
        interp.on_tick();
        interp.before_frame(host, alpha)
    }

    #[test]
    fn advancing_light_blends_and_restores() {
        let mut interp = LightInterpolator::new(&LightConfig::default());
        let mut host = TestLights { slots: vec![light(1, 0.0)] };
        assert_eq!(step(&mut interp, &mut host, 0.5).blended, 0);
        interp.after_frame(&mut host);

        host.slots[0] = light(2, 4.0);
        host.slots[0].as_mut().unwrap().orientation[0] = Vec3::Y;
        assert_eq!(step(&mut interp, &mut host, 0.25).blended, 1);
        let live = host.slots[0].as_ref().unwrap();
        assert_eq!(live.position, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(live.orientation[0], Vec3::new(0.75, 0.25, 0.0));
        assert_eq!(interp.after_frame(&mut host), 1);
        let live = host.slots[0].as_ref().unwrap();
        assert_eq!(live.position, Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(live.orientation[0], Vec3::Y);
    }

    #[test]
    fn recreated_light_restarts_its_counter() {
        let mut interp = LightInterpolator::new(&LightConfig::default());
        let mut host = TestLights { slots: vec![light(5, 0.0)] };
        step(&mut interp, &mut host, 0.5);
        host.slots[0] = light(1, 1.0);
        assert_eq!(step(&mut interp, &mut host, 0.5).blended, 0);
        assert!(!interp.is_eligible(0));
    }

    #[test]
    fn zero_counter_light_is_never_blended() {
        let mut interp = LightInterpolator::new(&LightConfig::default());
        let mut host = TestLights { slots: vec![light(0, 0.0)] };
        step(&mut interp, &mut host, 0.5);
        host.slots[0] = light(3, 1.0);
        assert_eq!(step(&mut interp, &mut host, 0.5).blended, 0);
    }
}
