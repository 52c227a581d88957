//! Spatial index benchmarks: tree rebuild, frustum culling and packet
//! extraction over a grid of meshes.

use std::hint::black_box;
use std::rc::Rc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use glam::Vec3;

use umbra::renderer::core::{Binding, BufferId, BufferSlice, FrameContext};
use umbra::renderer::graph::passes::GBufferPass;
use umbra::scene::{
    BlendMode, BoundingBox, Camera, FillMode, ObjectMask, Renderable, ShadingModel, SharedResource, SortData,
    SpatialIndex, VertexLayout,
};

struct Material;

impl SharedResource for Material {
    fn bindings(&self) -> &[Binding] {
        &[]
    }
}

struct Mesh {
    shared: Rc<dyn SharedResource>,
}

impl Renderable for Mesh {
    fn draw(&self, frame: &mut FrameContext<'_>) {
        frame.draw(0..36, 0..1);
    }

    fn sort_data(&self) -> SortData {
        SortData {
            mask: ObjectMask::new()
                .with_vertex_layout(VertexLayout::PNTBT)
                .with_shading_model(ShadingModel::DEFAULT_LIT)
                .with_blend_mode(BlendMode::OPAQUE)
                .with_fill_mode(FillMode::SOLID),
            shared: Rc::clone(&self.shared),
        }
    }

    fn per_object_data(&self) -> Binding {
        Binding::Buffer(BufferSlice {
            buffer: BufferId::default(),
            offset: 0,
            size: 128,
        })
    }
}

/// `side`³ unit boxes spaced two units apart, centered on the origin.
fn grid(side: usize) -> (SpatialIndex, Vec<Rc<dyn Renderable>>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let shared: Rc<dyn SharedResource> = Rc::new(Material);
    let mut index = SpatialIndex::default();
    let mut meshes = Vec::with_capacity(side * side * side);
    let offset = side as f32;
    for x in 0..side {
        for y in 0..side {
            for z in 0..side {
                let mesh: Rc<dyn Renderable> = Rc::new(Mesh {
                    shared: Rc::clone(&shared),
                });
                let center = Vec3::new(x as f32, y as f32, z as f32) * 2.0 - Vec3::splat(offset);
                index.register(&mesh, BoundingBox::from_center_extents(center, Vec3::splat(0.5)));
                meshes.push(mesh);
            }
        }
    }
    index.tick();
    (index, meshes)
}

fn camera() -> Camera {
    Camera::new_perspective(60.0, 16.0 / 9.0, 0.1, 200.0).looking_at(
        Vec3::new(0.0, 10.0, 60.0),
        Vec3::ZERO,
        Vec3::Y,
    )
}

fn bench_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_index_rebuild");
    for side in [10, 20] {
        let (mut index, _meshes) = grid(side);
        let handles = index.frustum_culling(camera().view_projection());
        group.bench_with_input(BenchmarkId::from_parameter(side * side * side), &side, |b, _| {
            b.iter(|| {
                if let Some(&handle) = handles.first()
                    && let Some(bounds) = index.bounds(handle)
                {
                    index.update(handle, bounds);
                }
                index.tick();
            });
        });
    }
    group.finish();
}

fn bench_culling(c: &mut Criterion) {
    let mut group = c.benchmark_group("frustum_culling");
    let view_proj = camera().view_projection();
    for side in [10, 20, 30] {
        let (index, _meshes) = grid(side);
        group.bench_with_input(BenchmarkId::from_parameter(side * side * side), &side, |b, _| {
            b.iter(|| black_box(index.frustum_culling(black_box(view_proj))));
        });
    }
    group.finish();
}

fn bench_extract(c: &mut Criterion) {
    let (index, _meshes) = grid(20);
    let candidates = index.frustum_culling(camera().view_projection());
    c.bench_function("extract_8000", |b| {
        b.iter(|| black_box(index.extract(GBufferPass::LIT_SOLID_FILTER, black_box(&candidates))));
    });
}

criterion_group!(benches, bench_rebuild, bench_culling, bench_extract);
criterion_main!(benches);
