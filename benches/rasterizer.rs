use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rustshade::bench::{draw_triangle, rasterize, ClipSpaceVertex, FlatShader, FrameBuffers, ScreenVertex};
use rustshade::config::{FramebufferStrategy, RenderConfig};
use rustshade::prelude::*;

const BUFFER_WIDTH: u32 = 800;
const BUFFER_HEIGHT: u32 = 600;

fn small_triangle() -> [ScreenVertex; 3] {
    [
        ScreenVertex::new(100.0, 100.0, 0.0),
        ScreenVertex::new(120.0, 100.0, 0.0),
        ScreenVertex::new(110.0, 120.0, 0.0),
    ]
}

fn medium_triangle() -> [ScreenVertex; 3] {
    [
        ScreenVertex::new(100.0, 100.0, 0.0),
        ScreenVertex::new(300.0, 100.0, 0.0),
        ScreenVertex::new(200.0, 300.0, 0.0),
    ]
}

fn large_triangle() -> [ScreenVertex; 3] {
    [
        ScreenVertex::new(50.0, 50.0, 0.0),
        ScreenVertex::new(750.0, 100.0, 0.0),
        ScreenVertex::new(400.0, 550.0, 0.0),
    ]
}

fn benchmark_coverage(c: &mut Criterion) {
    let mut group = c.benchmark_group("coverage");

    for (name, triangle) in [
        ("small", small_triangle()),
        ("medium", medium_triangle()),
        ("large", large_triangle()),
    ] {
        group.bench_with_input(BenchmarkId::new("edge_function", name), &triangle, |b, tri| {
            b.iter(|| rasterize(black_box(*tri), BUFFER_WIDTH, BUFFER_HEIGHT, |c| {
                black_box(c);
            }));
        });
    }

    group.finish();
}

fn benchmark_pipeline(c: &mut Criterion) {
    let projection = Mat4::perspective_rh(1.0, BUFFER_WIDTH as f32 / BUFFER_HEIGHT as f32, 0.1, 100.0);
    let vertex = |p: Vec3| ClipSpaceVertex::new(projection * Vec4::point(p), p, Vec3::BACK, Vec2::ZERO);
    let in_front = [
        vertex(Vec3::new(-2.0, -1.5, -4.0)),
        vertex(Vec3::new(2.0, -1.0, -5.0)),
        vertex(Vec3::new(0.0, 1.5, -3.0)),
    ];
    let straddling = [
        vertex(Vec3::new(-2.0, -1.0, -4.0)),
        vertex(Vec3::new(2.0, -1.0, -4.0)),
        vertex(Vec3::new(0.0, -1.0, 3.0)),
    ];
    let shader = FlatShader::new(Color::WHITE);
    let buffers = FrameBuffers::try_new(BUFFER_WIDTH, BUFFER_HEIGHT, Color::BLACK).unwrap();

    let mut group = c.benchmark_group("draw_triangle");
    for (name, tri) in [("in_front", in_front), ("near_clipped", straddling)] {
        group.bench_function(name, |b| {
            b.iter(|| {
                buffers.clear(Color::BLACK);
                draw_triangle(black_box(tri), &shader, &mut buffers.target())
            });
        });
    }
    group.finish();
}

fn showcase(workers: usize, strategy: FramebufferStrategy) -> Scene {
    let config = RenderConfig {
        workers,
        strategy,
        ..RenderConfig::default()
    };
    let mut scene = Scene::new(BUFFER_WIDTH, BUFFER_HEIGHT, config).unwrap();
    scene
        .camera_mut()
        .transform_mut()
        .set_position(Vec3::new(4.0, 3.0, 6.0))
        .look_at(Vec3::ZERO);
    scene.add_geometry(Geometry::plane("ground", 12.0, 12.0, 16));
    let mut ball = Geometry::sphere("ball", 1.0, 48, 32);
    ball.transform_mut().set_position_xyz(0.0, 1.0, 0.0);
    scene.add_geometry(ball);
    scene.add_light(
        Light::directional("key", Vec3::new(-0.4, -1.0, -0.3))
            .with_shadows(1024)
            .unwrap(),
    );
    scene
}

fn benchmark_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame");
    group.sample_size(20);

    let max_workers = rustshade::config::default_workers();
    for strategy in [FramebufferStrategy::RowLocked, FramebufferStrategy::PerWorker] {
        for workers in [1, max_workers] {
            let mut scene = showcase(workers, strategy);
            group.bench_function(BenchmarkId::new(format!("{strategy:?}"), workers), |b| {
                b.iter(|| scene.render_frame().unwrap());
            });
        }
    }

    group.finish();
}

criterion_group!(benches, benchmark_coverage, benchmark_pipeline, benchmark_frame);
criterion_main!(benches);
