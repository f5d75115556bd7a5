use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use archanim_animation_core::{
    AnimatedBlock, AnimatedBlockInfo, AnimationComponent, AnimationStep, BlockEntity, BlockPos,
    Cuboid, HorizontalAxis, HorizontalRotationComponent, LinearComponent, MovementMethod,
    RotatedPosition, VerticalRotationComponent,
};

struct NullEntity;

impl BlockEntity for NullEntity {
    fn spawn(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn kill(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn move_to_target(
        &mut self,
        _target: &RotatedPosition,
        _method: MovementMethod,
        _ticks_remaining: Option<u32>,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

fn blocks_for(cuboid: &Cuboid, component: &dyn AnimationComponent) -> Vec<AnimatedBlock> {
    cuboid
        .iter_animation_order()
        .map(|p| {
            let info = AnimatedBlockInfo {
                source: p,
                start_position: component.start_position(p.x, p.y, p.z),
                final_position: component.final_position(p.x, p.y, p.z),
                radius: component.radius(p.x, p.y, p.z),
                start_angle: component.start_angle(p.x, p.y, p.z),
                on_edge: cuboid.is_on_edge(p),
                bottom: cuboid.is_bottom(p),
            };
            AnimatedBlock::new(info, Box::new(NullEntity))
        })
        .collect()
}

fn bench_component(c: &mut Criterion, name: &str, component: &dyn AnimationComponent) {
    let mut group = c.benchmark_group(name);
    for side in [4, 8, 16] {
        let cuboid = Cuboid::new(BlockPos::new(0, 0, 0), BlockPos::new(side - 1, side - 1, 0));
        let mut blocks = blocks_for(&cuboid, component);
        group.bench_with_input(BenchmarkId::from_parameter(side * side), &side, |b, _| {
            let mut tick = 0u32;
            b.iter(|| {
                tick = tick % 40 + 1;
                let mut step =
                    AnimationStep::new(&mut blocks, component.movement_method(), Some(40 - tick));
                black_box(component.execute_animation_step(&mut step, black_box(tick))).ok();
            })
        });
    }
    group.finish();
}

fn linear_steps(c: &mut Criterion) {
    bench_component(c, "linear_step", &LinearComponent::new((0, 1, 0), 4, 40));
}

fn horizontal_rotation_steps(c: &mut Criterion) {
    let pivot = BlockPos::new(0, 0, 0);
    bench_component(c, "horizontal_rotation_step", &HorizontalRotationComponent::new(pivot, 1.0, 1, 40));
}

fn vertical_rotation_steps(c: &mut Criterion) {
    let pivot = BlockPos::new(0, 0, 0);
    bench_component(
        c,
        "vertical_rotation_step",
        &VerticalRotationComponent::new(pivot, HorizontalAxis::Z, 1.0, 40),
    );
}

criterion_group!(benches, linear_steps, horizontal_rotation_steps, vertical_rotation_steps);
criterion_main!(benches);
