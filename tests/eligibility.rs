use glam::{Quat, Vec3};
use tickblend::camera::CameraSkip;
use tickblend::host::{CameraMode, ModelNode, ObjectKind, PlayerBody, TagId};
use tickblend::sandbox::SandboxWorld;
use tickblend::{FrameReport, InterpolationConfig, Interpolator};

/// Ticks once, then opens and closes a frame window at `progress`, returning the world as presented.
fn tick_and_present(interp: &mut Interpolator, world: &mut SandboxWorld, progress: f32) -> (FrameReport, SandboxWorld) {
    interp.on_tick(world);
    world.set_progress(progress);
    let report = interp.before_frame(world);
    let presented = world.clone();
    interp.after_frame(world);
    (report, presented)
}

fn interpolator() -> Interpolator {
    Interpolator::new(InterpolationConfig::default())
}

#[test]
fn recreated_object_snaps_to_its_new_state() {
    let mut world = SandboxWorld::new();
    let slot = world.spawn_object(ObjectKind::Equipment, TagId(4), Vec3::ZERO, None);
    let mut interp = interpolator();
    tick_and_present(&mut interp, &mut world, 0.5);

    let old_id = world.object_id(slot);
    world.despawn_object(slot);
    assert_eq!(world.spawn_object(ObjectKind::Equipment, TagId(4), Vec3::new(1.0, 0.0, 0.0), None), slot);
    assert_ne!(world.object_id(slot), old_id);

    let (report, presented) = tick_and_present(&mut interp, &mut world, 0.5);
    assert_eq!(report.objects.blended, 0);
    assert!(!interp.objects().is_eligible(slot));
    assert_eq!(presented.object_center(slot), Some(Vec3::new(1.0, 0.0, 0.0)));
}

#[test]
fn changed_tag_suppresses_blending() {
    let mut world = SandboxWorld::new();
    let slot = world.spawn_object(ObjectKind::Weapon, TagId(4), Vec3::ZERO, None);
    let mut interp = interpolator();
    tick_and_present(&mut interp, &mut world, 0.5);
    let object = world.object_entry_mut(slot).unwrap();
    object.tag = TagId(5);
    object.center = Vec3::new(1.0, 0.0, 0.0);
    let (report, _) = tick_and_present(&mut interp, &mut world, 0.5);
    assert_eq!(report.objects.blended, 0);
}

#[test]
fn teleports_past_the_cap_are_not_blended() {
    let mut world = SandboxWorld::new();
    let biped = world.spawn_object(ObjectKind::Biped, TagId(1), Vec3::ZERO, None);
    let crate_slot = world.spawn_object(ObjectKind::Scenery, TagId(2), Vec3::ZERO, None);
    let mut interp = interpolator();
    tick_and_present(&mut interp, &mut world, 0.5);

    // 3.0 is past the biped cap (2.5) but inside the general one (7.5).
    world.move_object(biped, Vec3::new(3.0, 0.0, 0.0));
    world.move_object(crate_slot, Vec3::new(3.0, 0.0, 0.0));
    let (report, presented) = tick_and_present(&mut interp, &mut world, 0.5);
    assert_eq!(report.objects.blended, 1);
    assert_eq!(presented.object_center(biped), Some(Vec3::new(3.0, 0.0, 0.0)));
    assert_eq!(presented.object_center(crate_slot), Some(Vec3::new(1.5, 0.0, 0.0)));

    world.move_object(crate_slot, Vec3::new(11.0, 0.0, 0.0));
    let (report, presented) = tick_and_present(&mut interp, &mut world, 0.5);
    assert_eq!(report.objects.blended, 0);
    assert_eq!(presented.object_center(crate_slot), Some(Vec3::new(11.0, 0.0, 0.0)));
}

#[test]
fn micro_jitter_is_not_blended() {
    let mut world = SandboxWorld::new();
    let slot = world.spawn_object(ObjectKind::Scenery, TagId(2), Vec3::ZERO, None);
    let mut interp = interpolator();
    tick_and_present(&mut interp, &mut world, 0.5);
    world.move_object(slot, Vec3::new(0.01, 0.0, 0.0));
    let (report, _) = tick_and_present(&mut interp, &mut world, 0.5);
    assert_eq!(report.objects.blended, 0);
}

#[test]
fn wrapping_device_machine_is_not_blended() {
    let mut world = SandboxWorld::new();
    let slot = world.spawn_object(ObjectKind::DeviceMachine, TagId(9), Vec3::ZERO, None);
    let mut interp = interpolator();
    world.object_entry_mut(slot).unwrap().device_position = Some(0.95);
    tick_and_present(&mut interp, &mut world, 0.5);

    let object = world.object_entry_mut(slot).unwrap();
    object.device_position = Some(0.001);
    object.center = Vec3::new(0.0, 0.0, 1.0);
    let (report, _) = tick_and_present(&mut interp, &mut world, 0.5);
    assert_eq!(report.objects.blended, 0);

    let object = world.object_entry_mut(slot).unwrap();
    object.device_position = Some(0.05);
    object.center = Vec3::new(0.0, 0.0, 2.0);
    let (report, _) = tick_and_present(&mut interp, &mut world, 0.5);
    assert_eq!(report.objects.blended, 1);
}

#[test]
fn children_blend_from_their_own_history() {
    let mut world = SandboxWorld::new();
    let vehicle = world.spawn_object(ObjectKind::Vehicle, TagId(1), Vec3::ZERO, None);
    let rider = world.spawn_object(ObjectKind::Biped, TagId(2), Vec3::new(0.0, 0.0, 1.0), Some(vehicle));
    let rider_nodes = vec![ModelNode::new(Quat::IDENTITY, Vec3::ZERO, 1.0); 2];
    world.object_entry_mut(rider).unwrap().nodes = rider_nodes.clone();
    world.object_entry_mut(rider).unwrap().local_player = true;
    let mut interp = interpolator();
    tick_and_present(&mut interp, &mut world, 0.5);
    assert_eq!(interp.objects().children(vehicle).collect::<Vec<_>>(), vec![rider]);

    world.move_object(vehicle, Vec3::new(2.0, 0.0, 0.0));
    world.move_object(rider, Vec3::new(2.0, 0.0, 2.0));
    world.object_entry_mut(rider).unwrap().nodes[0].rotation = Quat::from_rotation_z(1.0);
    let (report, presented) = tick_and_present(&mut interp, &mut world, 0.25);
    assert_eq!(report.objects.blended, 2);
    assert_eq!(presented.object_center(vehicle), Some(Vec3::new(0.5, 0.0, 0.0)));
    assert_eq!(presented.object_center(rider), Some(Vec3::new(0.5, 0.0, 1.25)));
    assert!(!interp.objects().blends_skeleton(rider));
    assert_eq!(presented.object(rider).unwrap().nodes[0].rotation, Quat::from_rotation_z(1.0));
}

#[test]
fn remote_biped_blends_centre_but_not_skeleton() {
    let mut world = SandboxWorld::new();
    let biped = world.spawn_object(ObjectKind::Biped, TagId(1), Vec3::ZERO, None);
    world.object_entry_mut(biped).unwrap().nodes = vec![ModelNode::new(Quat::IDENTITY, Vec3::ZERO, 1.0); 3];
    let mut interp = interpolator();
    tick_and_present(&mut interp, &mut world, 0.5);

    world.move_object(biped, Vec3::new(1.0, 0.0, 0.0));
    world.object_entry_mut(biped).unwrap().nodes[1].position = Vec3::ONE;
    let (report, presented) = tick_and_present(&mut interp, &mut world, 0.5);
    assert_eq!(report.objects.blended, 1);
    assert_eq!(presented.object_center(biped), Some(Vec3::new(0.5, 0.0, 0.0)));
    assert_eq!(presented.object(biped).unwrap().nodes[1].position, Vec3::ONE);

    world.object_entry_mut(biped).unwrap().local_player = true;
    world.move_object(biped, Vec3::new(2.0, 0.0, 0.0));
    world.object_entry_mut(biped).unwrap().nodes[1].position = Vec3::ZERO;
    let (_, presented) = tick_and_present(&mut interp, &mut world, 0.5);
    assert!(interp.objects().blends_skeleton(biped));
    assert_eq!(presented.object(biped).unwrap().nodes[1].position, Vec3::splat(0.5));
}

#[test]
fn reset_never_blends_against_old_data() {
    let mut world = SandboxWorld::new();
    let slot = world.spawn_object(ObjectKind::Scenery, TagId(3), Vec3::ZERO, None);
    let particle = world.spawn_particle(Vec3::ZERO);
    let mut interp = interpolator();
    tick_and_present(&mut interp, &mut world, 0.5);
    world.move_object(slot, Vec3::new(1.0, 0.0, 0.0));
    world.move_particle(particle, Vec3::X);
    let (report, _) = tick_and_present(&mut interp, &mut world, 0.5);
    assert_eq!(report.objects.blended, 1);
    assert_eq!(report.particles.blended, 1);

    interp.on_reset(&mut world);
    world.move_object(slot, Vec3::new(2.0, 0.0, 0.0));
    world.move_particle(particle, Vec3::new(2.0, 0.0, 0.0));
    let (report, presented) = tick_and_present(&mut interp, &mut world, 0.5);
    assert_eq!(report.total_blended(), 0);
    assert_eq!(presented, world);

    world.move_object(slot, Vec3::new(3.0, 0.0, 0.0));
    let (report, _) = tick_and_present(&mut interp, &mut world, 0.5);
    assert_eq!(report.objects.blended, 1);
}

#[test]
fn new_particles_appear_in_place() {
    let mut world = SandboxWorld::new();
    let mut interp = interpolator();
    tick_and_present(&mut interp, &mut world, 0.5);
    let particle = world.spawn_particle(Vec3::new(4.0, 0.0, 0.0));
    let (report, presented) = tick_and_present(&mut interp, &mut world, 0.5);
    assert_eq!(report.particles.blended, 0);
    assert_eq!(presented.particle_position(particle), Some(Vec3::new(4.0, 0.0, 0.0)));
}

#[test]
fn camera_snaps_on_teleport_and_mode_change() {
    let mut world = SandboxWorld::new();
    world.camera_mode = CameraMode::Vehicle;
    let mut interp = interpolator();
    tick_and_present(&mut interp, &mut world, 0.5);
    world.camera.position = Vec3::new(2.0, 0.0, 0.0);
    let (report, presented) = tick_and_present(&mut interp, &mut world, 0.25);
    assert_eq!(report.camera.blended, 1);
    assert_eq!(presented.camera.position, Vec3::new(0.5, 0.0, 0.0));

    world.camera.position = Vec3::new(10.0, 0.0, 0.0);
    let (report, presented) = tick_and_present(&mut interp, &mut world, 0.5);
    assert_eq!(report.camera.blended, 0);
    assert_eq!(interp.camera().skip_reason(), Some(CameraSkip::Teleport));
    assert_eq!(presented.camera.position, Vec3::new(10.0, 0.0, 0.0));

    world.camera_mode = CameraMode::Debug;
    world.camera.position = Vec3::new(11.0, 0.0, 0.0);
    tick_and_present(&mut interp, &mut world, 0.5);
    assert_eq!(interp.camera().skip_reason(), Some(CameraSkip::ModeChanged));

    world.camera.position = Vec3::new(12.0, 0.0, 0.0);
    world.player = Some(PlayerBody { attached: false, health: 1.0 });
    let (report, _) = tick_and_present(&mut interp, &mut world, 0.5);
    assert_eq!(report.camera.blended, 0);
    assert_eq!(report.camera.skipped, 1);
}

#[test]
fn switching_held_item_snaps_the_view_model() {
    let mut world = SandboxWorld::new();
    world.view_model_active = true;
    world.held_item = 1;
    world.view_model = vec![ModelNode::new(Quat::IDENTITY, Vec3::ZERO, 1.0); 2];
    let mut interp = interpolator();
    tick_and_present(&mut interp, &mut world, 0.5);

    world.held_item = 2;
    world.view_model[0].position = Vec3::X;
    let (report, presented) = tick_and_present(&mut interp, &mut world, 0.5);
    assert_eq!(report.view_model.blended, 0);
    assert_eq!(presented.view_model[0].position, Vec3::X);

    world.view_model[0].position = Vec3::new(3.0, 0.0, 0.0);
    let (report, presented) = tick_and_present(&mut interp, &mut world, 0.5);
    assert_eq!(report.view_model.blended, 1);
    assert_eq!(presented.view_model[0].position, Vec3::new(2.0, 0.0, 0.0));
}
