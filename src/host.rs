//! Typed accessors through which the integration layer exposes live simulation state.
//!
//! Every lookup is by slot and returns `None` for an empty slot; interpolators treat that as "skip this
//! entity for the rest of the frame". Views borrow the host mutably so blended values can be written
//! straight back into live state.

use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};
use serde::Serialize;

/// Slot index plus a recreation salt. A slot reused by a new entity carries a different salt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct EntityId {
    pub index: u16,
    pub salt: u16,
}

impl EntityId {
    pub const fn new(index: u16, salt: u16) -> Self {
        Self { index, salt }
    }

    pub fn slot(self) -> usize {
        self.index as usize
    }
}

/// Identifier of the definition (tag) an entity was created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct TagId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CameraMode {
    #[default]
    FirstPerson,
    Vehicle,
    Cinematic,
    Debug,
    Dead,
}

/// Position plus the two orientation basis vectors of the render viewpoint.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CameraState {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
}

/// The local player's body as seen by the camera policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerBody {
    pub attached: bool,
    pub health: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct ModelNode {
    pub rotation: Quat,
    pub position: Vec3,
    pub scale: f32,
}

impl ModelNode {
    pub fn new(rotation: Quat, position: Vec3, scale: f32) -> Self {
        Self { rotation, position, scale }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ObjectKind {
    Biped,
    Vehicle,
    Weapon,
    Equipment,
    Projectile,
    #[default]
    Scenery,
    DeviceMachine,
    DeviceControl,
    LightFixture,
    SoundScenery,
}

pub struct ObjectView<'a> {
    pub id: EntityId,
    pub tag: TagId,
    pub kind: ObjectKind,
    pub parent: Option<EntityId>,
    pub local_player: bool,
    /// Animation position of device machines in [0,1]; `None` for every other kind.
    pub device_position: Option<f32>,
    pub center: &'a mut Vec3,
    pub nodes: &'a mut [ModelNode],
}

pub struct ParticleView<'a> {
    pub id: EntityId,
    pub position: &'a mut Vec3,
}

pub struct LightView<'a> {
    pub id: EntityId,
    /// Liveness counter; zero means the light has never been updated.
    pub counter: u32,
    pub position: &'a mut Vec3,
    pub orientation: &'a mut [Vec3; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChainKind {
    Flag,
    Antenna,
}

impl ChainKind {
    pub fn label(self) -> &'static str {
        match self {
            ChainKind::Flag => "flags",
            ChainKind::Antenna => "antennas",
        }
    }
}

/// A flag cloth or antenna: a short array of simulated vertices, the first one anchored.
pub struct ChainView<'a> {
    pub id: EntityId,
    pub vertices: &'a mut [Vec3],
}

pub trait ProgressSource {
    /// Raw fraction of the current tick elapsed. May be unclamped or non-monotonic.
    fn tick_progress(&self) -> f32;
    fn is_paused(&self) -> bool;
    fn effective_tick_rate(&self) -> f32;
    fn first_person_tick_rate(&self) -> f32;
    fn set_first_person_tick_rate(&mut self, rate: f32);
}

pub trait CameraHost {
    fn camera_mode(&self) -> CameraMode;
    fn followed_entity(&self) -> Option<EntityId>;
    fn spectating(&self) -> bool;
    fn local_player_body(&self) -> Option<PlayerBody>;
    fn camera_mut(&mut self) -> &mut CameraState;
}

pub trait ViewModelHost {
    fn view_model_active(&self) -> bool;
    fn held_item(&self) -> u32;
    fn view_model_nodes_mut(&mut self) -> &mut [ModelNode];
}

pub trait ObjectHost {
    /// Number of slots currently in use in the object table.
    fn object_slot_count(&self) -> usize;
    fn object_mut(&mut self, slot: usize) -> Option<ObjectView<'_>>;
    fn visible_object_count(&self) -> usize;
    fn visible_object(&self, index: usize) -> Option<usize>;
}

pub trait ParticleHost {
    fn particle_slot_count(&self) -> usize;
    fn particle_mut(&mut self, slot: usize) -> Option<ParticleView<'_>>;
}

pub trait LightHost {
    fn light_slot_count(&self) -> usize;
    fn light_mut(&mut self, slot: usize) -> Option<LightView<'_>>;
}

pub trait ChainHost {
    fn chain_slot_count(&self, kind: ChainKind) -> usize;
    fn chain_mut(&mut self, kind: ChainKind, slot: usize) -> Option<ChainView<'_>>;
}

/// Everything the coordinator needs from the host in one bound.
pub trait SimulationHost:
    ProgressSource + CameraHost + ViewModelHost + ObjectHost + ParticleHost + LightHost + ChainHost
{
}

impl<T> SimulationHost for T where
    T: ProgressSource + CameraHost + ViewModelHost + ObjectHost + ParticleHost + LightHost + ChainHost
{
}
