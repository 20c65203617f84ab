use maze::{
    generate::MazeGenerator,
    source::{build_grid, MazeRequest},
    Grid, Position, Tokens, Walker,
};
use proptest::prelude::*;

fn generated(seed: u64, width: u16, height: u16) -> Grid {
    let request = MazeRequest {
        height,
        width,
        ..MazeRequest::default()
    };
    build_grid(&mut MazeGenerator::new(seed), &request).unwrap()
}

fn adjacent(a: Position, b: Position) -> bool {
    a.x.abs_diff(b.x) + a.y.abs_diff(b.y) == 1
}

#[test]
fn solves_generated_maze() {
    let mut grid = generated(11, 15, 10);
    let mut walker = Walker::new(&mut grid).unwrap();
    assert_eq!(walker.start(), Position::new(2, 1));
    assert_eq!(walker.end(), Position::new(30, 21));

    let route = walker.solve().unwrap().route();
    assert_eq!(route.first(), Some(&Position::new(2, 1)));
    assert_eq!(route.last(), Some(&Position::new(30, 21)));
    assert!(route.windows(2).all(|w| adjacent(w[0], w[1])));
    drop(walker);

    for p in &route {
        assert!(grid.has(*p, Tokens::ROUTE));
        assert!(grid.has(*p, Tokens::VISITED));
    }
    // route cells and walls never overlap
    assert!(grid
        .positions()
        .all(|p| !(grid.has(p, Tokens::ROUTE) && grid.has(p, Tokens::WALL))));
}

#[test]
fn trace_dump_is_json() {
    let mut grid = generated(3, 5, 5);
    let mut walker = Walker::new(&mut grid).unwrap();
    let log = walker.solve().unwrap();

    let json = serde_json::to_value(log).unwrap();
    let traces = json["traces"].as_array().unwrap();
    assert_eq!(traces.len(), log.len());
    assert_eq!(traces[0]["position"]["x"], 2);
    assert_eq!(traces[0]["position"]["y"], 1);
    assert_eq!(traces[0]["flags"], "OK | VISITED");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn route_is_connected(seed in any::<u64>(), width in 1u16..12, height in 1u16..12) {
        let mut grid = generated(seed, width, height);
        let mut walker = Walker::new(&mut grid).unwrap();
        let (start, end) = (walker.start(), walker.end());
        let route = walker.solve().unwrap().route();

        prop_assert_eq!(route.first(), Some(&start));
        prop_assert_eq!(route.last(), Some(&end));
        prop_assert!(route.windows(2).all(|w| adjacent(w[0], w[1])));
    }

    #[test]
    fn solving_is_deterministic(seed in any::<u64>(), size in 1u16..10) {
        let mut a = generated(seed, size, size);
        let mut b = generated(seed, size, size);
        let log_a = Walker::new(&mut a).unwrap().solve().unwrap().clone();
        let log_b = Walker::new(&mut b).unwrap().solve().unwrap().clone();

        prop_assert_eq!(log_a.traces(), log_b.traces());
        prop_assert_eq!(a, b);
    }
}
