use criterion::{black_box, criterion_group, criterion_main, Criterion};
use maze::{
    generate::MazeGenerator,
    source::{build_grid, MazeRequest},
    Grid, WalkState, Walker,
};

fn load_generated_maze(size: u16) -> Grid {
    let request = MazeRequest {
        height: size,
        width: size,
        ..MazeRequest::default()
    };
    build_grid(&mut MazeGenerator::new(42), &request).unwrap()
}

fn bench_maze_sized(c: &mut Criterion, size: u16) {
    let grid = load_generated_maze(size);

    c.bench_function(&format!("maze_{}x{}", size, size), |b| {
        b.iter(|| {
            let mut grid = black_box(grid.clone());
            let mut walker = Walker::new(&mut grid).unwrap();
            walker.solve().unwrap();
            assert_eq!(walker.state(), WalkState::Done);
        })
    });
}

pub fn maze_small(c: &mut Criterion) {
    bench_maze_sized(c, 10);
}

pub fn maze_medium(c: &mut Criterion) {
    bench_maze_sized(c, 50);
}

pub fn maze_large(c: &mut Criterion) {
    bench_maze_sized(c, 200);
}

criterion_group!(benches, maze_small, maze_medium, maze_large);
criterion_main!(benches);
