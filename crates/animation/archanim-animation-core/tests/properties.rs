use std::sync::Arc;

use archanim_animation_core::{
    AnimatedBlockManager, AnimationComponent, AnimationContext, AnimationRequestData,
    AnimationState, BlockPos, BlockSubstitutionManager, Cuboid, LinearComponent,
    StructureSnapshot,
};
use archanim_test_fixtures::{structures, Harness, RecordingHook, WorldEvent};

fn context(snapshot: &StructureSnapshot) -> AnimationContext {
    AnimationContext {
        structure: snapshot.uid,
        kind: snapshot.kind,
        animation_type: Default::default(),
        world: snapshot.world.clone(),
    }
}

/// A manager holding the substitutes of the portcullis fixture, with the
/// originals already removed.
fn populated(h: &Harness) -> (BlockSubstitutionManager, StructureSnapshot, LinearComponent) {
    let snapshot = structures::load("portcullis_cube").unwrap();
    h.place_structure(&snapshot);
    let component = LinearComponent::new((0, 1, 0), 3, 20);
    let mut manager =
        BlockSubstitutionManager::new(Arc::new(h.substitution_factory()), h.scheduler.clone());
    assert!(manager.create_animated_blocks(
        &snapshot,
        &component,
        &context(&snapshot),
        component.movement_method(),
    ));
    (manager, snapshot, component)
}

#[test]
fn completion_and_restore_are_idempotent() {
    let h = Harness::new();
    let (mut manager, _, _) = populated(&h);
    manager.handle_animation_completion().unwrap();
    assert!(manager.is_empty());
    let after_first = h.world.events();
    manager.handle_animation_completion().unwrap();
    manager.restore_blocks_on_failure().unwrap();
    assert_eq!(h.world.events(), after_first);

    let h = Harness::new();
    let (mut manager, _, _) = populated(&h);
    manager.restore_blocks_on_failure().unwrap();
    assert!(manager.is_empty());
    let after_first = h.world.events();
    manager.restore_blocks_on_failure().unwrap();
    assert_eq!(h.world.events(), after_first);
}

#[test]
fn put_blocks_only_places_once() {
    let h = Harness::new();
    let snapshot = structures::load("portcullis_cube").unwrap();
    h.place_structure(&snapshot);
    let animator = h.animator(AnimationRequestData::builder(snapshot).build().unwrap());
    h.launch(&animator);
    h.scheduler.run_ticks(2);

    animator.put_blocks();
    let placed = h.world.placements().len();
    assert_eq!(placed, 27);
    animator.put_blocks();
    animator.stop_animation();
    animator.abort();
    assert_eq!(h.world.placements().len(), placed);
    assert_eq!(h.tracker.finished_count(animator.id()), 1);
}

#[test]
fn region_tracks_live_blocks_every_step() {
    let h = Harness::new();
    let snapshot = structures::load("big_door").unwrap();
    h.place_structure(&snapshot);
    let animator = h.animator(AnimationRequestData::builder(snapshot.clone()).build().unwrap());
    h.launch(&animator);
    let animation = animator.animation().unwrap();

    while !animator.is_terminated() {
        h.scheduler.tick();
        if !matches!(
            animation.state(),
            AnimationState::Active | AnimationState::Finishing
        ) {
            continue;
        }
        let latest: Vec<_> = snapshot
            .cuboid
            .iter_animation_order()
            .map(|src| {
                h.world
                    .moves_of(src)
                    .last()
                    .map(|p| p.position)
                    .unwrap_or_else(|| src.to_vector())
            })
            .collect();
        let expected = Cuboid::bounding(latest.iter()).unwrap();
        let region = animation.region();
        assert_eq!(region, expected, "step {}", animation.steps_executed());
        let (min, max) = (region.min(), region.max());
        assert!(min.x <= max.x && min.y <= max.y && min.z <= max.z);
    }
}

#[test]
fn states_only_move_forward() {
    let mut h = Harness::new();
    h.register_hook("rec", RecordingHook::factory("rec", h.hook_log.clone()));
    let snapshot = structures::load("drawbridge").unwrap();
    h.place_structure(&snapshot);
    let animator = h.animator(AnimationRequestData::builder(snapshot).build().unwrap());
    h.launch(&animator);
    h.run_to_completion();

    let animation = animator.animation().unwrap();
    use AnimationState::*;
    assert_eq!(
        animation.state_history(),
        vec![Pending, Active, Finishing, Stopping, Completed]
    );

    // Every state a hook observed is at or after the one before it.
    let seen: Vec<AnimationState> = h.hook_calls().into_iter().map(|c| c.state).collect();
    for pair in seen.windows(2) {
        assert!(pair[0].can_transition_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
    }
}

#[test]
fn steps_count_up_to_duration_before_finishing() {
    let mut h = Harness::new();
    h.register_hook("rec", RecordingHook::factory("rec", h.hook_log.clone()));
    let snapshot = structures::load("sliding_door").unwrap();
    h.place_structure(&snapshot);
    let request = AnimationRequestData::builder(snapshot).animation_time(0.5).build().unwrap();
    let animator = h.animator(request);
    assert_eq!(animator.duration_ticks(), 10);
    assert_eq!(animator.stop_count(), 15);
    h.launch(&animator);
    h.run_to_completion();

    let post: Vec<_> = h
        .hook_calls()
        .into_iter()
        .filter(|c| c.action == "on_post_animation_step")
        .collect();
    let steps: Vec<u32> = post.iter().map(|c| c.steps_executed).collect();
    assert_eq!(steps, (1..=15).collect::<Vec<_>>());
    let first_finishing = post
        .iter()
        .find(|c| c.state == AnimationState::Finishing)
        .unwrap();
    assert_eq!(first_finishing.steps_executed, 11);
    assert!(post[..10].iter().all(|c| c.state == AnimationState::Active));
}

#[test]
fn perpetual_animation_never_finishes_on_its_own() {
    let h = Harness::new();
    let snapshot = structures::load("windmill").unwrap();
    h.place_structure(&snapshot);
    let request = AnimationRequestData::builder(snapshot.clone()).build().unwrap();
    assert!(request.is_perpetual());
    let animator = h.animator(request);
    h.launch(&animator);

    h.scheduler.run_ticks(500);
    let animation = animator.animation().unwrap();
    assert_eq!(animation.steps_executed(), 500);
    assert_eq!(animation.state(), AnimationState::Active);
    assert!(!animation.state_history().contains(&AnimationState::Finishing));

    animator.stop_animation();
    assert_eq!(animation.state(), AnimationState::Completed);
    // A windmill ends where it started.
    let placed = h.world.placements();
    assert_eq!(placed.len(), snapshot.cuboid.volume());
    assert!(snapshot.cuboid.iter_animation_order().all(|p| placed.contains(&p)));
}

#[test]
fn restore_and_completion_place_the_same_number_of_blocks() {
    let h = Harness::new();
    let (mut manager, snapshot, component) = populated(&h);
    let n = manager.animated_blocks().len();
    h.world.clear_events();
    manager.restore_blocks_on_failure().unwrap();
    let restored = h.world.placements();
    assert_eq!(restored.len(), n);
    for pos in snapshot.cuboid.iter_animation_order() {
        assert!(restored.contains(&pos));
    }
    assert_eq!(manager.animated_blocks().len(), 0);

    let h = Harness::new();
    let (mut manager, snapshot, _) = populated(&h);
    h.world.clear_events();
    manager.handle_animation_completion().unwrap();
    let completed = h.world.placements();
    assert_eq!(completed.len(), n);
    for pos in snapshot.cuboid.iter_animation_order() {
        let target = component.final_position(pos.x, pos.y, pos.z);
        assert!(completed.contains(&BlockPos::from_position(&target.position)));
    }
    assert_eq!(manager.animated_blocks().len(), 0);
    assert_eq!(
        h.world.count(|e| matches!(e, WorldEvent::Killed { .. })),
        n
    );
}
