use archanim_animation_core::{AnimationRequestData, AnimationState, AnimationType, PreviewColor};
use archanim_test_fixtures::{structures, Harness, WorldEvent};

fn preview_request(h: &Harness, name: &str) -> AnimationRequestData {
    let snapshot = structures::load(name).unwrap();
    h.place_structure(&snapshot);
    AnimationRequestData::builder(snapshot)
        .animation_type(AnimationType::Preview)
        .build()
        .unwrap()
}

#[test]
fn preview_leaves_the_world_alone() {
    let h = Harness::new();
    let animator = h.preview_animator(preview_request(&h, "portcullis_cube"));
    let before = h.world.positions();
    h.launch(&animator);

    assert_eq!(h.world.count(|e| matches!(e, WorldEvent::Previewed { .. })), 26);
    let corners = h.world.count(|e| {
        matches!(
            e,
            WorldEvent::Previewed {
                color: PreviewColor::Corner,
                ..
            }
        )
    });
    assert_eq!(corners, 8);

    h.run_to_completion();
    let animation = animator.animation().unwrap();
    assert_eq!(animation.state(), AnimationState::Completed);
    assert!(h.world.deletions().is_empty());
    assert!(h.world.placements().is_empty());
    assert_eq!(h.world.positions(), before);
    assert_eq!(h.world.count(|e| matches!(e, WorldEvent::Killed { .. })), 26);

    // Previews never claim the structure nor re-check redstone.
    assert!(!h.activity.is_busy(animator.structure_id()));
    assert!(h.verifier.verified().is_empty());
    assert_eq!(h.tracker.finished_count(animator.id()), 1);
}

#[test]
fn previews_share_a_structure_but_exclude_writers() {
    let h = Harness::new();
    let first = h.preview_animator(preview_request(&h, "big_door"));
    let second = h.preview_animator(preview_request(&h, "big_door"));
    let uid = first.structure_id();
    h.launch(&first);
    h.launch(&second);
    assert_eq!(h.activity.animators_for(uid).len(), 2);
    assert!(h.activity.is_animating(uid));
    assert!(!h.activity.is_busy(uid));

    // Busy may still be claimed, but a writer cannot join the previews.
    let snapshot = structures::load("big_door").unwrap();
    let writer = h.animator(AnimationRequestData::builder(snapshot).build().unwrap());
    assert!(!h.activity.add_animator(writer));

    h.run_to_completion();
    assert_eq!(h.activity.active_count(), 0);
    assert_eq!(h.tracker.finished().len(), 2);
}

#[test]
fn preview_refused_while_a_writer_runs() {
    let h = Harness::new();
    let snapshot = structures::load("drawbridge").unwrap();
    h.place_structure(&snapshot);
    let writer = h.animator(AnimationRequestData::builder(snapshot).build().unwrap());
    h.launch(&writer);

    let preview = h.preview_animator(preview_request(&h, "drawbridge"));
    assert!(!h.activity.add_animator(preview.clone()));
    assert_eq!(h.activity.animator(writer.structure_id()).unwrap().id(), writer.id());
    assert!(preview.animation().is_none());
}

#[test]
fn aborted_preview_only_despawns() {
    let h = Harness::new();
    let animator = h.preview_animator(preview_request(&h, "sliding_door"));
    h.launch(&animator);
    h.scheduler.run_ticks(4);
    animator.abort();

    assert_eq!(h.world.count(|e| matches!(e, WorldEvent::Killed { .. })), 6);
    assert!(h.world.placements().is_empty());
    assert_eq!(h.world.block_count(), 6);
    assert_eq!(h.tracker.finished_count(animator.id()), 1);
}
