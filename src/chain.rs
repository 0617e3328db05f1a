use crate::config::ChainConfig;
use crate::generation::GenerationRing;
use crate::host::{ChainHost, ChainKind, EntityId};
use crate::interpolator::{EntityInterpolator, FramePass};
use crate::math::{lerp_point, squared_distance};
use crate::report::BlendCounts;
use glam::Vec3;

#[derive(Debug, Clone, Copy, Default)]
struct ChainRecord {
    live: bool,
    eligible: bool,
    touched: bool,
    id: EntityId,
    vertex_count: usize,
}

struct ChainGeneration {
    records: Box<[ChainRecord]>,
    vertices: Box<[Vec3]>,
}

impl ChainGeneration {
    fn with_capacity(capacity: usize, vertex_capacity: usize) -> Self {
        Self {
            records: vec![ChainRecord::default(); capacity].into_boxed_slice(),
            vertices: vec![Vec3::ZERO; capacity * vertex_capacity].into_boxed_slice(),
        }
    }

    fn clear(&mut self) {
        self.records.fill(ChainRecord::default());
        self.vertices.fill(Vec3::ZERO);
    }
}

/// Flag cloth and antenna vertex chains. One instance per [`ChainKind`]; the two kinds share the code
/// but keep separate buffers and caps.
pub struct ChainInterpolator {
    kind: ChainKind,
    generations: GenerationRing<ChainGeneration, 2>,
    capacity: usize,
    vertex_capacity: usize,
    teleport_distance_squared: f32,
}

impl ChainInterpolator {
    pub fn new(kind: ChainKind, config: &ChainConfig) -> Self {
        let (capacity, vertex_capacity) = (config.capacity, config.vertex_capacity);
        Self {
            kind,
            generations: GenerationRing::from_fn(|_| ChainGeneration::with_capacity(capacity, vertex_capacity)),
            capacity,
            vertex_capacity,
            teleport_distance_squared: config.teleport_distance_squared,
        }
    }

    pub fn kind(&self) -> ChainKind {
        self.kind
    }

    pub fn is_eligible(&self, slot: usize) -> bool {
        self.generations.current().records[slot].eligible
    }

    fn span(&self, slot: usize, len: usize) -> std::ops::Range<usize> {
        let start = slot * self.vertex_capacity;
        start..start + len
    }

    fn capture<H: ChainHost + ?Sized>(&mut self, host: &mut H) -> u32 {
        let slot_count = host.chain_slot_count(self.kind);
        assert!(
            slot_count <= self.capacity,
            "{} table reports {slot_count} slots but the buffer holds {}",
            self.kind.label(),
            self.capacity
        );
        let vertex_capacity = self.vertex_capacity;
        let cap = self.teleport_distance_squared;
        let kind = self.kind;
        let (current, previous) = self.generations.current_and_previous_mut();
        current.records.fill(ChainRecord::default());
        let mut captured = 0;
        for slot in 0..slot_count {
            let Some(view) = host.chain_mut(kind, slot) else {
                continue;
            };
            let count = view.vertices.len();
            assert!(
                count <= vertex_capacity,
                "{} slot {slot} has {count} vertices but the buffer holds {vertex_capacity}",
                kind.label()
            );
            let start = slot * vertex_capacity;
            current.vertices[start..start + count].copy_from_slice(&view.vertices[..]);

            let prev = &previous.records[slot];
            let eligible = prev.live
                && prev.id == view.id
                && prev.vertex_count == count
                && count > 0
                && squared_distance(previous.vertices[start], current.vertices[start]) < cap;
            current.records[slot] = ChainRecord { live: true, eligible, touched: false, id: view.id, vertex_count: count };
            captured += 1;
        }
        captured
    }
}

impl EntityInterpolator for ChainInterpolator {
    fn label(&self) -> &'static str {
        self.kind.label()
    }

    fn on_tick(&mut self) {
        self.generations.mark_rollover();
    }

    fn clear(&mut self) {
        self.generations.reset(ChainGeneration::clear);
    }
}

impl<H: ChainHost + ?Sized> FramePass<H> for ChainInterpolator {
    fn before_frame(&mut self, host: &mut H, alpha: f32) -> BlendCounts {
        let mut counts = BlendCounts::default();
        if self.generations.take_rollover() {
            counts.captured = self.capture(host);
        }
        let kind = self.kind;
        let slot_count = host.chain_slot_count(kind).min(self.capacity);
        let vertex_capacity = self.vertex_capacity;
        let (current, previous) = self.generations.current_and_previous_mut();
        for slot in 0..slot_count {
            let record = &mut current.records[slot];
            if !record.eligible {
                continue;
            }
            let Some(view) = host.chain_mut(kind, slot) else {
                counts.skipped += 1;
                continue;
            };
            if view.id != record.id || view.vertices.len() != record.vertex_count {
                counts.skipped += 1;
                continue;
            }
            let start = slot * vertex_capacity;
            let end = start + record.vertex_count;
            for ((vertex, prev), cur) in view
                .vertices
                .iter_mut()
                .zip(&previous.vertices[start..end])
                .zip(&current.vertices[start..end])
            {
                *vertex = lerp_point(*prev, *cur, alpha);
            }
            record.touched = true;
            counts.blended += 1;
        }
        counts
    }

    fn after_frame(&mut self, host: &mut H) -> u32 {
        let kind = self.kind;
        let mut restored = 0;
        for slot in 0..self.capacity {
            let record = self.generations.current().records[slot];
            if !record.touched {
                continue;
            }
            self.generations.current_mut().records[slot].touched = false;
            let span = self.span(slot, record.vertex_count);
            let Some(view) = host.chain_mut(kind, slot) else {
                continue;
            };
            if view.id == record.id && view.vertices.len() == record.vertex_count {
                view.vertices.copy_from_slice(&self.generations.current().vertices[span]);
                restored += 1;
            }
        }
        restored
    }
}
