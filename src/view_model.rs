use crate::config::ViewModelConfig;
use crate::generation::GenerationRing;
use crate::host::{ModelNode, ViewModelHost};
use crate::interpolator::{EntityInterpolator, FramePass};
use crate::math::{lerp_point, lerp_scalar, slerp_quaternion};
use crate::report::BlendCounts;
use bytemuck::Zeroable;

struct ViewModelGeneration {
    valid: bool,
    active: bool,
    held_item: u32,
    node_count: usize,
    nodes: Box<[ModelNode]>,
}

impl ViewModelGeneration {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            valid: false,
            active: false,
            held_item: 0,
            node_count: 0,
            nodes: vec![ModelNode::zeroed(); capacity].into_boxed_slice(),
        }
    }

    fn clear(&mut self) {
        self.valid = false;
        self.active = false;
        self.held_item = 0;
        self.node_count = 0;
        self.nodes.fill(ModelNode::zeroed());
    }
}

/// First-person weapon and hands. The whole node array blends as one unit.
pub struct ViewModelInterpolator {
    generations: GenerationRing<ViewModelGeneration, 2>,
    eligible: bool,
    applied: bool,
}

impl ViewModelInterpolator {
    pub fn new(config: &ViewModelConfig) -> Self {
        let capacity = config.node_capacity;
        Self {
            generations: GenerationRing::from_fn(|_| ViewModelGeneration::with_capacity(capacity)),
            eligible: false,
            applied: false,
        }
    }

    pub fn eligible(&self) -> bool {
        self.eligible
    }

    fn capture<H: ViewModelHost + ?Sized>(&mut self, host: &mut H) {
        let active = host.view_model_active();
        let held_item = host.held_item();
        let (current, previous) = self.generations.current_and_previous_mut();
        let live = host.view_model_nodes_mut();
        assert!(
            live.len() <= current.nodes.len(),
            "view model has {} nodes but the buffer holds {}",
            live.len(),
            current.nodes.len()
        );
        current.nodes[..live.len()].copy_from_slice(live);
        current.node_count = live.len();
        current.held_item = held_item;
        current.active = active;
        current.valid = true;

        self.eligible = active
            && previous.valid
            && previous.active
            && previous.held_item == held_item
            && previous.node_count == current.node_count;
        if previous.valid && previous.held_item != held_item {
            log::trace!("view model: held item changed {} -> {held_item}", previous.held_item);
        }
    }
}

impl EntityInterpolator for ViewModelInterpolator {
    fn label(&self) -> &'static str {
        "view_model"
    }

    fn on_tick(&mut self) {
        self.generations.mark_rollover();
    }

    fn clear(&mut self) {
        self.generations.reset(ViewModelGeneration::clear);
        self.eligible = false;
        self.applied = false;
    }
}

impl<H: ViewModelHost + ?Sized> FramePass<H> for ViewModelInterpolator {
    fn before_frame(&mut self, host: &mut H, alpha: f32) -> BlendCounts {
        let mut counts = BlendCounts::default();
        if self.generations.take_rollover() {
            self.capture(host);
            counts.captured = 1;
        }
        if !self.eligible {
            counts.skipped = 1;
            return counts;
        }

        let current = self.generations.current();
        let previous = self.generations.previous();
        let live = host.view_model_nodes_mut();
        if live.len() != current.node_count {
            counts.skipped = 1;
            return counts;
        }
        for ((node, prev), cur) in live.iter_mut().zip(previous.nodes.iter()).zip(current.nodes.iter()) {
            node.rotation = slerp_quaternion(prev.rotation, cur.rotation, alpha);
            node.position = lerp_point(prev.position, cur.position, alpha);
            node.scale = lerp_scalar(prev.scale, cur.scale, alpha);
        }
        self.applied = true;
        counts.blended = 1;
        counts
    }

    fn after_frame(&mut self, host: &mut H) -> u32 {
        if !self.applied {
            return 0;
        }
        self.applied = false;
        let current = self.generations.current();
        let live = host.view_model_nodes_mut();
        let count = live.len().min(current.node_count);
        live[..count].copy_from_slice(&current.nodes[..count]);
        1
    }
}
