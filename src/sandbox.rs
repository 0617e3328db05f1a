//! In-memory simulation host.
//!
//! `SandboxWorld` keeps every entity kind in slot tables with per-slot recreation salts, the way a game's
//! object tables do, and implements all host accessor traits on top of them. It backs the trace driver and
//! the test suites. The world is `Clone + PartialEq`, so a snapshot taken before `before_frame` can be
//! compared with the state after `after_frame`.

use crate::host::{
    CameraHost, CameraMode, CameraState, ChainHost, ChainKind, ChainView, EntityId, LightHost, LightView,
    ModelNode, ObjectHost, ObjectKind, ObjectView, ParticleHost, ParticleView, PlayerBody, ProgressSource,
    TagId, ViewModelHost,
};
use glam::Vec3;

#[derive(Debug, Clone, PartialEq)]
struct SlotTable<T> {
    slots: Vec<(u16, Option<T>)>,
}

impl<T> Default for SlotTable<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T> SlotTable<T> {
    /// Stores `value` in the first free slot, bumping that slot's salt. Salts are never zero.
    fn insert(&mut self, value: T) -> (usize, EntityId) {
        let slot = match self.slots.iter().position(|(_, entry)| entry.is_none()) {
            Some(slot) => {
                let (salt, entry) = &mut self.slots[slot];
                *salt = if *salt == u16::MAX { 1 } else { *salt + 1 };
                *entry = Some(value);
                slot
            }
            None => {
                self.slots.push((1, Some(value)));
                self.slots.len() - 1
            }
        };
        (slot, EntityId::new(slot as u16, self.slots[slot].0))
    }

    fn remove(&mut self, slot: usize) -> Option<T> {
        self.slots.get_mut(slot)?.1.take()
    }

    fn id(&self, slot: usize) -> Option<EntityId> {
        match self.slots.get(slot)? {
            (salt, Some(_)) => Some(EntityId::new(slot as u16, *salt)),
            _ => None,
        }
    }

    fn get(&self, slot: usize) -> Option<&T> {
        self.slots.get(slot)?.1.as_ref()
    }

    fn get_mut(&mut self, slot: usize) -> Option<(EntityId, &mut T)> {
        match self.slots.get_mut(slot)? {
            (salt, Some(value)) => Some((EntityId::new(slot as u16, *salt), value)),
            _ => None,
        }
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn live(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(slot, (_, entry))| entry.as_ref().map(|value| (slot, value)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SandboxObject {
    pub tag: TagId,
    pub kind: ObjectKind,
    pub parent: Option<EntityId>,
    pub local_player: bool,
    pub device_position: Option<f32>,
    pub center: Vec3,
    pub nodes: Vec<ModelNode>,
}

#[derive(Debug, Clone, PartialEq)]
struct SandboxLight {
    counter: u32,
    position: Vec3,
    orientation: [Vec3; 2],
}

#[derive(Debug, Clone, PartialEq)]
pub struct SandboxWorld {
    progress: f32,
    paused: bool,
    tick_rate: f32,
    first_person_tick_rate: f32,
    pub camera_mode: CameraMode,
    pub followed: Option<EntityId>,
    pub spectating: bool,
    pub player: Option<PlayerBody>,
    pub camera: CameraState,
    pub view_model_active: bool,
    pub held_item: u32,
    pub view_model: Vec<ModelNode>,
    objects: SlotTable<SandboxObject>,
    visible: Vec<usize>,
    particles: SlotTable<Vec3>,
    lights: SlotTable<SandboxLight>,
    flags: SlotTable<Vec<Vec3>>,
    antennas: SlotTable<Vec<Vec3>>,
}

impl Default for SandboxWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SandboxWorld {
    pub fn new() -> Self {
        Self {
            progress: 0.0,
            paused: false,
            tick_rate: 30.0,
            first_person_tick_rate: 0.0,
            camera_mode: CameraMode::FirstPerson,
            followed: None,
            spectating: false,
            player: Some(PlayerBody { attached: false, health: 1.0 }),
            camera: CameraState { position: Vec3::ZERO, forward: Vec3::X, up: Vec3::Z },
            view_model_active: false,
            held_item: 0,
            view_model: Vec::new(),
            objects: SlotTable::default(),
            visible: Vec::new(),
            particles: SlotTable::default(),
            lights: SlotTable::default(),
            flags: SlotTable::default(),
            antennas: SlotTable::default(),
        }
    }

    pub fn set_progress(&mut self, progress: f32) {
        self.progress = progress;
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn set_tick_rate(&mut self, rate: f32) {
        self.tick_rate = rate;
    }

    pub fn spawn_object(&mut self, kind: ObjectKind, tag: TagId, center: Vec3, parent: Option<usize>) -> usize {
        let parent = parent.and_then(|slot| self.objects.id(slot));
        let object = SandboxObject {
            tag,
            kind,
            parent,
            local_player: false,
            device_position: (kind == ObjectKind::DeviceMachine).then_some(0.0),
            center,
            nodes: Vec::new(),
        };
        let (slot, _) = self.objects.insert(object);
        self.refresh_visible();
        slot
    }

    /// Frees `slot` and every object attached to it.
    pub fn despawn_object(&mut self, slot: usize) {
        let Some(id) = self.objects.id(slot) else {
            return;
        };
        self.objects.remove(slot);
        let children: Vec<usize> =
            self.objects.live().filter(|(_, object)| object.parent == Some(id)).map(|(child, _)| child).collect();
        for child in children {
            self.despawn_object(child);
        }
        self.refresh_visible();
    }

    pub fn attach_object(&mut self, slot: usize, parent: Option<usize>) {
        let parent = parent.and_then(|parent| self.objects.id(parent));
        if let Some((_, object)) = self.objects.get_mut(slot) {
            object.parent = parent;
        }
        self.refresh_visible();
    }

    pub fn object_id(&self, slot: usize) -> Option<EntityId> {
        self.objects.id(slot)
    }

    pub fn object(&self, slot: usize) -> Option<&SandboxObject> {
        self.objects.get(slot)
    }

    pub fn object_entry_mut(&mut self, slot: usize) -> Option<&mut SandboxObject> {
        self.objects.get_mut(slot).map(|(_, object)| object)
    }

    pub fn object_center(&self, slot: usize) -> Option<Vec3> {
        self.objects.get(slot).map(|object| object.center)
    }

    pub fn move_object(&mut self, slot: usize, center: Vec3) {
        if let Some(object) = self.object_entry_mut(slot) {
            object.center = center;
        }
    }

    fn refresh_visible(&mut self) {
        self.visible.clear();
        let roots = self.objects.live().filter(|(_, object)| object.parent.is_none()).map(|(slot, _)| slot);
        self.visible.extend(roots);
    }

    pub fn spawn_particle(&mut self, position: Vec3) -> usize {
        self.particles.insert(position).0
    }

    pub fn despawn_particle(&mut self, slot: usize) {
        self.particles.remove(slot);
    }

    pub fn particle_position(&self, slot: usize) -> Option<Vec3> {
        self.particles.get(slot).copied()
    }

    pub fn move_particle(&mut self, slot: usize, position: Vec3) {
        if let Some((_, particle)) = self.particles.get_mut(slot) {
            *particle = position;
        }
    }

    pub fn live_particles(&self) -> impl Iterator<Item = usize> + '_ {
        self.particles.live().map(|(slot, _)| slot)
    }

    /// New lights start with a zero counter and become blendable after two updates.
    pub fn spawn_light(&mut self, position: Vec3, orientation: [Vec3; 2]) -> usize {
        self.lights.insert(SandboxLight { counter: 0, position, orientation }).0
    }

    pub fn despawn_light(&mut self, slot: usize) {
        self.lights.remove(slot);
    }

    /// Moves the light and advances its liveness counter, as a simulation update would.
    pub fn update_light(&mut self, slot: usize, position: Vec3, orientation: [Vec3; 2]) {
        if let Some((_, light)) = self.lights.get_mut(slot) {
            light.counter = light.counter.wrapping_add(1).max(1);
            light.position = position;
            light.orientation = orientation;
        }
    }

    pub fn light_position(&self, slot: usize) -> Option<Vec3> {
        self.lights.get(slot).map(|light| light.position)
    }

    fn chain_table(&self, kind: ChainKind) -> &SlotTable<Vec<Vec3>> {
        match kind {
            ChainKind::Flag => &self.flags,
            ChainKind::Antenna => &self.antennas,
        }
    }

    fn chain_table_mut(&mut self, kind: ChainKind) -> &mut SlotTable<Vec<Vec3>> {
        match kind {
            ChainKind::Flag => &mut self.flags,
            ChainKind::Antenna => &mut self.antennas,
        }
    }

    pub fn spawn_chain(&mut self, kind: ChainKind, vertices: Vec<Vec3>) -> usize {
        self.chain_table_mut(kind).insert(vertices).0
    }

    pub fn despawn_chain(&mut self, kind: ChainKind, slot: usize) {
        self.chain_table_mut(kind).remove(slot);
    }

    pub fn translate_chain(&mut self, kind: ChainKind, slot: usize, offset: Vec3) {
        if let Some((_, vertices)) = self.chain_table_mut(kind).get_mut(slot) {
            for vertex in vertices.iter_mut() {
                *vertex += offset;
            }
        }
    }

    pub fn chain_vertices(&self, kind: ChainKind, slot: usize) -> Option<&[Vec3]> {
        self.chain_table(kind).get(slot).map(Vec::as_slice)
    }
}

impl ProgressSource for SandboxWorld {
    fn tick_progress(&self) -> f32 {
        self.progress
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn effective_tick_rate(&self) -> f32 {
        self.tick_rate
    }

    fn first_person_tick_rate(&self) -> f32 {
        self.first_person_tick_rate
    }

    fn set_first_person_tick_rate(&mut self, rate: f32) {
        self.first_person_tick_rate = rate;
    }
}

impl CameraHost for SandboxWorld {
    fn camera_mode(&self) -> CameraMode {
        self.camera_mode
    }

    fn followed_entity(&self) -> Option<EntityId> {
        self.followed
    }

    fn spectating(&self) -> bool {
        self.spectating
    }

    fn local_player_body(&self) -> Option<PlayerBody> {
        self.player
    }

    fn camera_mut(&mut self) -> &mut CameraState {
        &mut self.camera
    }
}

impl ViewModelHost for SandboxWorld {
    fn view_model_active(&self) -> bool {
        self.view_model_active
    }

    fn held_item(&self) -> u32 {
        self.held_item
    }

    fn view_model_nodes_mut(&mut self) -> &mut [ModelNode] {
        &mut self.view_model
    }
}

impl ObjectHost for SandboxWorld {
    fn object_slot_count(&self) -> usize {
        self.objects.len()
    }

    fn object_mut(&mut self, slot: usize) -> Option<ObjectView<'_>> {
        let (id, object) = self.objects.get_mut(slot)?;
        Some(ObjectView {
            id,
            tag: object.tag,
            kind: object.kind,
            parent: object.parent,
            local_player: object.local_player,
            device_position: object.device_position,
            center: &mut object.center,
            nodes: &mut object.nodes,
        })
    }

    fn visible_object_count(&self) -> usize {
        self.visible.len()
    }

    fn visible_object(&self, index: usize) -> Option<usize> {
        self.visible.get(index).copied()
    }
}

impl ParticleHost for SandboxWorld {
    fn particle_slot_count(&self) -> usize {
        self.particles.len()
    }

    fn particle_mut(&mut self, slot: usize) -> Option<ParticleView<'_>> {
        let (id, position) = self.particles.get_mut(slot)?;
        Some(ParticleView { id, position })
    }
}

impl LightHost for SandboxWorld {
    fn light_slot_count(&self) -> usize {
        self.lights.len()
    }

    fn light_mut(&mut self, slot: usize) -> Option<LightView<'_>> {
        let (id, light) = self.lights.get_mut(slot)?;
        Some(LightView { id, counter: light.counter, position: &mut light.position, orientation: &mut light.orientation })
    }
}

impl ChainHost for SandboxWorld {
    fn chain_slot_count(&self, kind: ChainKind) -> usize {
        self.chain_table(kind).len()
    }

    fn chain_mut(&mut self, kind: ChainKind, slot: usize) -> Option<ChainView<'_>> {
        let (id, vertices) = self.chain_table_mut(kind).get_mut(slot)?;
        Some(ChainView { id, vertices: vertices.as_mut_slice() })
    }
}
