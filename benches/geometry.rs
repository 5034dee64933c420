use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use meshkit::backend::BufferUsage;
use meshkit::math::{Mat4, Vec3};
use meshkit::{GeometryBuffer, Mesh, MeshOptions, SoftwareBackend};

const DETAILS: [u32; 3] = [16, 64, 256];

fn plane(backend: &mut SoftwareBackend, detail: u32) -> Mesh {
    Mesh::plane(backend, detail, detail, MeshOptions::default()).unwrap()
}

fn benchmark_compute_normals(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_normals");
    let mut backend = SoftwareBackend::new();

    for detail in DETAILS {
        let mut mesh = plane(&mut backend, detail);
        group.bench_with_input(BenchmarkId::from_parameter(detail), &detail, |b, _| {
            b.iter(|| mesh.compute_normals(black_box(&mut backend)).unwrap());
        });
    }

    group.finish();
}

fn benchmark_compute_wireframe(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_wireframe");
    let mut backend = SoftwareBackend::new();

    for detail in DETAILS {
        let mut mesh = plane(&mut backend, detail);
        group.bench_with_input(BenchmarkId::from_parameter(detail), &detail, |b, _| {
            b.iter(|| mesh.compute_wireframe(black_box(&mut backend)).unwrap());
        });
    }

    group.finish();
}

fn benchmark_inverse(c: &mut Criterion) {
    let matrix = Mat4::look_at(Vec3::new(3.0, 2.0, 5.0), Vec3::ZERO, Vec3::Y)
        * Mat4::rotation_y(0.7)
        * Mat4::scaling(2.0, 0.5, 1.5);

    c.bench_function("mat4_inverse", |b| {
        b.iter(|| black_box(&matrix).inverse().unwrap());
    });
}

fn benchmark_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_compile");
    let mut backend = SoftwareBackend::new();

    for count in [1_000usize, 100_000] {
        let positions: Vec<Vec3> = (0..count)
            .map(|i| Vec3::new(i as f32, (i * 2) as f32, (i * 3) as f32))
            .collect();
        let mut buffer = GeometryBuffer::new(&mut backend, meshkit::backend::BufferTarget::Vertex)
            .unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(count), &positions, |b, data| {
            b.iter(|| {
                buffer
                    .compile(&mut backend, black_box(data.as_slice()), BufferUsage::Static)
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_compute_normals,
    benchmark_compute_wireframe,
    benchmark_inverse,
    benchmark_compile
);
criterion_main!(benches);
