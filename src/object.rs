use crate::config::ObjectConfig;
use crate::generation::GenerationRing;
use crate::host::{EntityId, ModelNode, ObjectHost, ObjectKind, TagId};
use crate::interpolator::{EntityInterpolator, FramePass};
use crate::math::{lerp_point, lerp_scalar, slerp_quaternion, squared_distance};
use crate::report::BlendCounts;
use bitflags::bitflags;
use bytemuck::Zeroable;
use glam::Vec3;
use smallvec::SmallVec;

/// Device machines animate a [0,1] position that wraps; crossing these bounds is a reset, not motion.
const DEVICE_WRAP_HIGH: f32 = 0.9;
const DEVICE_WRAP_LOW: f32 = 0.002;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct RecordFlags: u8 {
        const VALID = 1 << 0;
        const ELIGIBLE = 1 << 1;
        const SKELETON = 1 << 2;
        const TOUCHED = 1 << 3;
    }
}

impl Default for RecordFlags {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ObjectRecord {
    flags: RecordFlags,
    id: EntityId,
    tag: TagId,
    kind: ObjectKind,
    center: Vec3,
    device_position: f32,
    node_count: u16,
    first_child: Option<u16>,
    next_sibling: Option<u16>,
}

struct ObjectGeneration {
    records: Box<[ObjectRecord]>,
    nodes: Box<[ModelNode]>,
    node_capacity: usize,
}

impl ObjectGeneration {
    fn new(capacity: usize, node_capacity: usize) -> Self {
        Self {
            records: vec![ObjectRecord::default(); capacity].into_boxed_slice(),
            nodes: vec![ModelNode::zeroed(); capacity * node_capacity].into_boxed_slice(),
            node_capacity,
        }
    }

    fn nodes(&self, slot: usize) -> &[ModelNode] {
        let start = slot * self.node_capacity;
        &self.nodes[start..start + self.records[slot].node_count as usize]
    }

    fn nodes_mut(&mut self, slot: usize, count: usize) -> &mut [ModelNode] {
        let start = slot * self.node_capacity;
        &mut self.nodes[start..start + count]
    }

    fn clear(&mut self) {
        self.records.fill(ObjectRecord::default());
        self.nodes.fill(ModelNode::zeroed());
    }
}

/// Epoch-stamped visit marks, so starting a new traversal never touches the whole array.
struct VisitTracker {
    marks: Box<[u32]>,
    epoch: u32,
}

impl VisitTracker {
    fn new(capacity: usize) -> Self {
        Self { marks: vec![0; capacity].into_boxed_slice(), epoch: 1 }
    }

    fn begin(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        if self.epoch == 0 {
            self.marks.fill(0);
            self.epoch = 1;
        }
    }

    /// Marks `slot` and reports whether it was unmarked before.
    fn mark(&mut self, slot: usize) -> bool {
        let fresh = self.marks[slot] != self.epoch;
        self.marks[slot] = self.epoch;
        fresh
    }
}

/// Distance caps and guards applied when a new generation is captured.
#[derive(Debug, Clone, Copy)]
struct ObjectPolicy {
    biped_distance_squared: f32,
    other_distance_squared: f32,
    jitter_distance_squared: f32,
}

impl ObjectPolicy {
    fn evaluate(&self, current: &ObjectRecord, previous: &ObjectRecord, attached: bool, local: bool) -> RecordFlags {
        if !previous.flags.contains(RecordFlags::VALID) {
            return RecordFlags::empty();
        }
        if previous.id != current.id || previous.tag != current.tag {
            return RecordFlags::empty();
        }
        let cap = match current.kind {
            ObjectKind::Biped => self.biped_distance_squared,
            _ => self.other_distance_squared,
        };
        let moved = squared_distance(previous.center, current.center);
        if moved >= cap || moved < self.jitter_distance_squared {
            return RecordFlags::empty();
        }
        if current.kind == ObjectKind::DeviceMachine
            && current.device_position < DEVICE_WRAP_LOW
            && previous.device_position > DEVICE_WRAP_HIGH
        {
            return RecordFlags::empty();
        }

        let remote_biped = current.kind == ObjectKind::Biped && !local;
        let skeleton = !remote_biped
            && !attached
            && current.node_count > 0
            && current.node_count == previous.node_count;
        if skeleton {
            RecordFlags::ELIGIBLE | RecordFlags::SKELETON
        } else {
            RecordFlags::ELIGIBLE
        }
    }
}

/// World objects: centre position plus per-node skeleton transforms, organised as a parent/child forest.
///
/// Children are linked intrusively (`first_child` / `next_sibling` slot indices) when a generation is
/// captured, so no list is allocated per object. Blending walks the visible set with an explicit stack and
/// resolves every child before its parent.
pub struct ObjectInterpolator {
    generations: GenerationRing<ObjectGeneration, 2>,
    policy: ObjectPolicy,
    capacity: usize,
    node_capacity: usize,
    stack: SmallVec<[(u16, bool); 64]>,
    visits: VisitTracker,
}

impl ObjectInterpolator {
    pub fn new(config: &ObjectConfig) -> Self {
        assert!(config.capacity <= u16::MAX as usize + 1, "object capacity exceeds slot index range");
        assert!(config.node_capacity <= u16::MAX as usize, "object node capacity exceeds node count range");
        Self {
            generations: GenerationRing::from_fn(|_| ObjectGeneration::new(config.capacity, config.node_capacity)),
            policy: ObjectPolicy {
                biped_distance_squared: config.biped_distance_squared,
                other_distance_squared: config.other_distance_squared,
                jitter_distance_squared: config.jitter_distance_squared,
            },
            capacity: config.capacity,
            node_capacity: config.node_capacity,
            stack: SmallVec::new(),
            visits: VisitTracker::new(config.capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether `slot` may be blended during the current tick.
    pub fn is_eligible(&self, slot: usize) -> bool {
        self.generations.current().records[slot].flags.contains(RecordFlags::ELIGIBLE)
    }

    /// Whether node-level animation of `slot` is blended during the current tick.
    pub fn blends_skeleton(&self, slot: usize) -> bool {
        self.generations.current().records[slot].flags.contains(RecordFlags::SKELETON)
    }

    /// Slots linked as children of `slot` in the current generation.
    pub fn children(&self, slot: usize) -> impl Iterator<Item = usize> + '_ {
        let records = &self.generations.current().records;
        std::iter::successors(records[slot].first_child, move |&child| records[child as usize].next_sibling)
            .map(usize::from)
    }

    fn capture<H: ObjectHost + ?Sized>(&mut self, host: &mut H) -> u32 {
        let slot_count = host.object_slot_count();
        assert!(
            slot_count <= self.capacity,
            "object table reports {slot_count} slots but the buffer holds {}",
            self.capacity
        );
        let policy = self.policy;
        let node_capacity = self.node_capacity;
        let (current, previous) = self.generations.current_and_previous_mut();
        current.records.fill(ObjectRecord::default());

        let mut captured = 0;
        for slot in 0..slot_count {
            let Some(view) = host.object_mut(slot) else {
                continue;
            };
            let node_count = view.nodes.len();
            assert!(
                node_count <= node_capacity,
                "object {slot} has {node_count} nodes but the buffer holds {node_capacity}"
            );
            current.nodes_mut(slot, node_count).copy_from_slice(view.nodes);

            let record = &mut current.records[slot];
            record.id = view.id;
            record.tag = view.tag;
            record.kind = view.kind;
            record.center = *view.center;
            record.device_position = view.device_position.unwrap_or(0.0);
            record.node_count = node_count as u16;
            record.flags = RecordFlags::VALID
                | policy.evaluate(record, &previous.records[slot], view.parent.is_some(), view.local_player);
            captured += 1;

            if let Some(parent) = view.parent {
                let parent_slot = parent.slot();
                assert!(parent_slot < self.capacity, "parent slot {parent_slot} outside object buffer");
                if parent_slot != slot {
                    current.records[slot].next_sibling = current.records[parent_slot].first_child;
                    current.records[parent_slot].first_child = Some(slot as u16);
                }
            }
        }
        captured
    }
}

fn blend_object<H: ObjectHost + ?Sized>(
    host: &mut H,
    current: &mut ObjectGeneration,
    previous: &ObjectGeneration,
    slot: usize,
    alpha: f32,
    counts: &mut BlendCounts,
) {
    let record = current.records[slot];
    if !record.flags.contains(RecordFlags::ELIGIBLE) {
        counts.skipped += 1;
        return;
    }
    let Some(view) = host.object_mut(slot) else {
        counts.skipped += 1;
        return;
    };
    if view.id != record.id || view.tag != record.tag {
        counts.skipped += 1;
        return;
    }

    let prev = &previous.records[slot];
    *view.center = lerp_point(prev.center, record.center, alpha);
    let mut flags = record.flags | RecordFlags::TOUCHED;
    if record.flags.contains(RecordFlags::SKELETON) && view.nodes.len() == record.node_count as usize {
        let nodes = view.nodes.iter_mut().zip(previous.nodes(slot)).zip(current.nodes(slot));
        for ((node, from), to) in nodes {
            node.position = lerp_point(from.position, to.position, alpha);
            node.rotation = slerp_quaternion(from.rotation, to.rotation, alpha);
            node.scale = lerp_scalar(from.scale, to.scale, alpha);
        }
    } else {
        flags.remove(RecordFlags::SKELETON);
    }
    current.records[slot].flags = flags;
    counts.blended += 1;
}

impl EntityInterpolator for ObjectInterpolator {
    fn label(&self) -> &'static str {
        "objects"
    }

    fn on_tick(&mut self) {
        self.generations.mark_rollover();
    }

    fn clear(&mut self) {
        self.generations.reset(ObjectGeneration::clear);
        self.stack.clear();
        self.visits = VisitTracker::new(self.capacity);
    }
}

impl<H: ObjectHost + ?Sized> FramePass<H> for ObjectInterpolator {
    fn before_frame(&mut self, host: &mut H, alpha: f32) -> BlendCounts {
        let mut counts = BlendCounts::default();
        if self.generations.take_rollover() {
            counts.captured = self.capture(host);
        }

        let mut stack = std::mem::take(&mut self.stack);
        stack.clear();
        self.visits.begin();
        let (current, previous) = self.generations.current_and_previous_mut();

        for index in 0..host.visible_object_count() {
            let Some(root) = host.visible_object(index) else {
                continue;
            };
            assert!(root < self.capacity, "visible object slot {root} outside object buffer");
            if !self.visits.mark(root) {
                continue;
            }
            stack.push((root as u16, false));
            while let Some((slot, expanded)) = stack.pop() {
                let slot = slot as usize;
                if expanded {
                    blend_object(host, current, previous, slot, alpha, &mut counts);
                    continue;
                }
                stack.push((slot as u16, true));
                let mut child = current.records[slot].first_child;
                while let Some(next) = child {
                    if self.visits.mark(next as usize) {
                        stack.push((next, false));
                    }
                    child = current.records[next as usize].next_sibling;
                }
            }
        }

        self.stack = stack;
        counts
    }

    fn after_frame(&mut self, host: &mut H) -> u32 {
        let current = self.generations.current_mut();
        let mut restored = 0;
        for slot in 0..current.records.len() {
            let record = current.records[slot];
            if !record.flags.contains(RecordFlags::TOUCHED) {
                continue;
            }
            current.records[slot].flags.remove(RecordFlags::TOUCHED);
            let Some(view) = host.object_mut(slot) else {
                continue;
            };
            if view.id != record.id {
                continue;
            }
            *view.center = record.center;
            if record.flags.contains(RecordFlags::SKELETON) {
                let authoritative = current.nodes(slot);
                if view.nodes.len() == authoritative.len() {
                    view.nodes.copy_from_slice(authoritative);
                }
            }
            restored += 1;
        }
        restored
    }
}
