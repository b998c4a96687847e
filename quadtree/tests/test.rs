use sparse_quadtree::quadtree::{
    CellKey, Config, Population, QuadTree, Quadrant, RebuildDriver, MAX_KEY_DEPTH,
};
use sparse_quadtree::shapes::{Circle, Point, Rectangle};
use sparse_quadtree::QuadtreeError;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Arc;

fn world() -> Rectangle {
    Rectangle::new(0.0, 0.0, 100.0, 100.0)
}

fn random_positions(rng: &mut StdRng, count: usize, bounds: &Rectangle) -> Vec<Point> {
    (0..count).map(|_| bounds.random_point_inside(rng)).collect()
}

fn sorted(mut values: Vec<u32>) -> Vec<u32> {
    values.sort_unstable();
    values
}

fn build(config: Config, positions: &Vec<Point>) -> QuadTree {
    let mut qt = QuadTree::new_with_config(world(), config).unwrap();
    qt.rebuild(positions, 0..positions.len() as u32);
    qt
}

#[test]
fn test_single_subdivision_scenario() {
    let config = Config {
        max_entities: 2,
        node_capacity: 1,
        max_depth: 2,
    };
    let mut qt = QuadTree::new_with_config(Rectangle::new(0.0, 0.0, 2.0, 2.0), config).unwrap();
    let positions = vec![Point::new(0.4, 0.4), Point::new(0.6, 0.6)];
    qt.insert(0, positions[0], &positions);
    qt.insert(1, positions[1], &positions);

    let top_right = CellKey::ROOT.child(Quadrant::TopRight);
    assert_eq!(qt.stats().subdivisions, 1);
    assert_eq!(qt.population(top_right), Some(Population::Internal));
    assert_eq!(
        qt.members(top_right.child(Quadrant::BottomLeft)).collect::<Vec<_>>(),
        vec![0]
    );
    assert_eq!(
        qt.members(top_right.child(Quadrant::TopRight)).collect::<Vec<_>>(),
        vec![1]
    );

    let everything = qt.query(&Rectangle::new(0.0, 0.0, 2.0, 2.0)).unwrap();
    assert_eq!(sorted(everything), vec![0, 1]);

    let top_right_bounds = qt.geometry().rectangle_of(top_right);
    assert_eq!(top_right_bounds, Rectangle::new(0.5, 0.5, 1.0, 1.0));
    assert_eq!(sorted(qt.query(&top_right_bounds).unwrap()), vec![0, 1]);

    let bottom_left_bounds = qt
        .geometry()
        .rectangle_of(CellKey::ROOT.child(Quadrant::BottomLeft));
    assert!(qt.query(&bottom_left_bounds).unwrap().is_empty());
}

#[test]
fn test_full_world_query_returns_every_entity() {
    let mut rng = StdRng::seed_from_u64(7);
    let positions = random_positions(&mut rng, 2000, &world());
    let config = Config {
        max_entities: 2000,
        node_capacity: 4,
        max_depth: 8,
    };
    let qt = build(config, &positions);

    let found = qt.query(&world()).unwrap();
    assert_eq!(found.len(), 2000);
    assert_eq!(sorted(found), (0..2000).collect::<Vec<u32>>());
    assert_eq!(qt.len(), 2000);
    assert!(qt.stats().deepest_depth <= 8);
}

#[test]
fn test_query_results_invariant_to_insertion_order() {
    let mut rng = StdRng::seed_from_u64(11);
    let positions = random_positions(&mut rng, 500, &world());
    let config = Config {
        max_entities: 500,
        node_capacity: 3,
        max_depth: 7,
    };

    let in_order = build(config.clone(), &positions);

    let mut order: Vec<u32> = (0..500).collect();
    order.shuffle(&mut rng);
    let mut shuffled = QuadTree::new_with_config(world(), config).unwrap();
    shuffled.rebuild(&positions, order.iter().copied());

    let full_a = sorted(in_order.query(&world()).unwrap());
    let full_b = sorted(shuffled.query(&world()).unwrap());
    assert_eq!(full_a, full_b);

    for _ in 0..50 {
        let area = Rectangle::new(
            rng.gen_range(-50.0..50.0),
            rng.gen_range(-50.0..50.0),
            rng.gen_range(0.0..40.0),
            rng.gen_range(0.0..40.0),
        );
        let a: HashSet<u32> = in_order.query(&area).unwrap().into_iter().collect();
        let b: HashSet<u32> = shuffled.query(&area).unwrap().into_iter().collect();
        // Cell layout follows insertion order; both must still cover the exact answer
        for (index, p) in positions.iter().enumerate() {
            let inside = p.x > area.left()
                && p.x < area.right()
                && p.y > area.bottom()
                && p.y < area.top();
            if inside {
                assert!(a.contains(&(index as u32)));
                assert!(b.contains(&(index as u32)));
            }
        }
    }
}

#[test]
fn test_query_covers_all_points_inside_box() {
    let mut rng = StdRng::seed_from_u64(3);
    let positions = random_positions(&mut rng, 1500, &world());
    let qt = build(Config::default(), &positions);

    for _ in 0..100 {
        let area = Rectangle::new(
            rng.gen_range(-60.0..60.0),
            rng.gen_range(-60.0..60.0),
            rng.gen_range(0.0..30.0),
            rng.gen_range(0.0..30.0),
        );
        let found = qt.query(&area).unwrap();
        let unique: HashSet<u32> = found.iter().copied().collect();
        assert_eq!(unique.len(), found.len(), "duplicate entity in result");

        for (index, p) in positions.iter().enumerate() {
            let inside = p.x > area.left()
                && p.x < area.right()
                && p.y > area.bottom()
                && p.y < area.top();
            if inside {
                assert!(unique.contains(&(index as u32)), "missed {:?} in {:?}", p, area);
            }
        }
    }
}

#[test]
fn test_disjoint_query_is_empty() {
    let mut rng = StdRng::seed_from_u64(5);
    let right_half = Rectangle::new(25.0, 0.0, 50.0, 100.0);
    let positions: Vec<Point> = random_positions(&mut rng, 300, &right_half)
        .into_iter()
        .map(|p| Point::new(p.x.max(0.01), p.y))
        .collect();
    let qt = build(Config::default(), &positions);

    let left = Rectangle::from_min_max(-50.0, -50.0, -10.0, 50.0);
    assert!(qt.query(&left).unwrap().is_empty());

    let outside = Rectangle::new(500.0, 500.0, 10.0, 10.0);
    assert!(qt.query(&outside).unwrap().is_empty());
}

#[test]
fn test_query_empty_tree() {
    let qt = QuadTree::new(world()).unwrap();
    assert!(qt.query(&world()).unwrap().is_empty());
    assert!(qt.is_empty());
    assert_eq!(qt.populated_cells().count(), 0);
}

#[test]
fn test_clear_forgets_every_cell() {
    let mut rng = StdRng::seed_from_u64(9);
    let positions = random_positions(&mut rng, 400, &world());
    let mut qt = build(
        Config {
            max_entities: 400,
            node_capacity: 2,
            max_depth: 6,
        },
        &positions,
    );

    let keys: Vec<CellKey> = qt.populated_cells().map(|cell| cell.key).collect();
    assert!(!keys.is_empty());
    assert!(qt.stats().subdivisions > 0);

    qt.clear();
    for key in keys {
        assert_eq!(qt.population(key), None);
        assert_eq!(qt.members(key).count(), 0);
    }
    assert!(qt.query(&world()).unwrap().is_empty());
    assert_eq!(qt.stats(), Default::default());
}

#[test]
fn test_each_entity_lives_in_exactly_one_leaf() {
    let mut rng = StdRng::seed_from_u64(21);
    let positions = random_positions(&mut rng, 1000, &world());
    let qt = build(
        Config {
            max_entities: 1000,
            node_capacity: 3,
            max_depth: 9,
        },
        &positions,
    );

    let mut seen = vec![0u32; positions.len()];
    for cell in qt.populated_cells() {
        let members: Vec<u32> = qt.members(cell.key).collect();
        match cell.population {
            Population::Internal => assert!(members.is_empty()),
            Population::Leaf(count) => {
                assert_eq!(count as usize, members.len());
                for index in members {
                    seen[index as usize] += 1;
                    let p = positions[index as usize];
                    assert!(
                        cell.bounds.contains_point(p.x, p.y),
                        "{:?} outside its cell {:?}",
                        p,
                        cell.bounds
                    );
                }
            }
        }
    }
    assert!(seen.iter().all(|&count| count == 1));
}

#[test]
fn test_internal_cells_never_take_members() {
    let config = Config {
        max_entities: 64,
        node_capacity: 2,
        max_depth: 5,
    };
    let mut qt = QuadTree::new_with_config(world(), config).unwrap();
    let mut rng = StdRng::seed_from_u64(13);
    let cluster = Rectangle::new(20.0, 20.0, 8.0, 8.0);
    let positions = random_positions(&mut rng, 64, &cluster);

    for index in 0..16u32 {
        qt.insert(index, positions[index as usize], &positions);
    }
    let internal: Vec<CellKey> = qt
        .populated_cells()
        .filter(|cell| cell.population == Population::Internal)
        .map(|cell| cell.key)
        .collect();
    assert!(!internal.is_empty());

    for index in 16..64u32 {
        qt.insert(index, positions[index as usize], &positions);
    }
    for key in internal {
        assert_eq!(qt.population(key), Some(Population::Internal));
        assert_eq!(qt.members(key).count(), 0);
    }
}

#[test]
fn test_deepest_cells_accept_without_bound() {
    let config = Config {
        max_entities: 50,
        node_capacity: 1,
        max_depth: 3,
    };
    let mut qt = QuadTree::new_with_config(world(), config).unwrap();
    let positions = vec![Point::new(30.0, 30.0); 50];
    for index in 0..50 {
        qt.insert(index, positions[index as usize], &positions);
    }

    let stats = qt.stats();
    assert_eq!(stats.deepest_depth, 3);
    assert_eq!(stats.subdivisions, 2);
    assert_eq!(stats.internal_cells, 2);
    assert_eq!(stats.leaf_cells, 1);

    let leaf = qt
        .populated_cells()
        .find(|cell| !cell.population.is_internal()).unwrap();
    assert_eq!(leaf.depth, 3);
    assert_eq!(leaf.population, Population::Leaf(50));
    assert_eq!(qt.members(leaf.key).count(), 50);
}

#[test]
fn test_redistribution_does_not_cascade() {
    // The split leaves a full child behind; it only splits on a later insert
    let config = Config {
        max_entities: 4,
        node_capacity: 2,
        max_depth: 6,
    };
    let mut qt = QuadTree::new_with_config(world(), config).unwrap();
    let positions = vec![
        Point::new(30.0, 30.0),
        Point::new(31.0, 31.0),
        Point::new(10.0, 10.0),
    ];
    for index in 0..3 {
        qt.insert(index, positions[index as usize], &positions);
    }
    assert_eq!(qt.stats().subdivisions, 1);
    let crowded = CellKey::from_path([Quadrant::TopRight, Quadrant::TopRight]);
    assert_eq!(qt.population(crowded), Some(Population::Leaf(2)));
    let lone = CellKey::from_path([Quadrant::TopRight, Quadrant::BottomLeft]);
    assert_eq!(qt.population(lone), Some(Population::Leaf(1)));
}

#[test]
fn test_query_circle_is_broad_phase() {
    let positions = vec![
        Point::new(10.0, 10.0),
        Point::new(12.0, 12.0),
        Point::new(-30.0, -30.0),
    ];
    let qt = build(Config::default(), &positions);

    let zap = Circle::new(10.0, 10.0, 1.0);
    let mut candidates = Vec::new();
    qt.query_circle(&zap, &mut candidates).unwrap();
    assert!(candidates.contains(&0));
    assert!(!candidates.contains(&2));

    let hits: Vec<u32> = candidates
        .into_iter()
        .filter(|&index| zap.contains_point(positions[index as usize]))
        .collect();
    assert_eq!(hits, vec![0]);
}

#[test]
fn test_query_variants_agree() {
    let mut rng = StdRng::seed_from_u64(17);
    let positions = random_positions(&mut rng, 800, &world());
    let qt = build(Config::default(), &positions);
    let area = Rectangle::from_min_max(-20.0, -5.0, 15.0, 30.0);

    let returned = sorted(qt.query(&area).unwrap());

    let mut appended = vec![u32::MAX];
    qt.query_into(&area, &mut appended).unwrap();
    assert_eq!(appended[0], u32::MAX);
    assert_eq!(sorted(appended[1..].to_vec()), returned);

    let mut extent = Vec::new();
    qt.query_rect_extent(-20.0, -5.0, 15.0, 30.0, &mut extent).unwrap();
    assert_eq!(sorted(extent), returned);

    let mut visited = Vec::new();
    qt.query_with(&area, |index| visited.push(index)).unwrap();
    assert_eq!(sorted(visited), returned);
}

#[test]
fn test_invalid_queries_are_rejected() {
    let qt = QuadTree::new(world()).unwrap();
    assert_eq!(
        qt.query(&Rectangle::new(0.0, 0.0, -1.0, 2.0)),
        Err(QuadtreeError::InvalidRectangleDims {
            width: -1.0,
            height: 2.0
        })
    );
    let mut found = Vec::new();
    assert!(matches!(
        qt.query_rect_extent(5.0, 0.0, 1.0, 1.0, &mut found),
        Err(QuadtreeError::InvalidRectExtent { .. })
    ));
    assert!(matches!(
        qt.query_circle(&Circle::new(0.0, 0.0, -3.0), &mut found),
        Err(QuadtreeError::InvalidCircleRadius { .. })
    ));
    assert!(found.is_empty());
}

#[test]
fn test_invalid_construction() {
    assert!(matches!(
        QuadTree::new(Rectangle::new(0.0, 0.0, 0.0, 10.0)),
        Err(QuadtreeError::InvalidWorldBounds { .. })
    ));
    assert!(matches!(
        QuadTree::new(Rectangle::new(f32::NAN, 0.0, 10.0, 10.0)),
        Err(QuadtreeError::InvalidWorldBounds { .. })
    ));
    let zero_capacity = Config {
        node_capacity: 0,
        ..Config::default()
    };
    assert!(matches!(
        QuadTree::new_with_config(world(), zero_capacity),
        Err(QuadtreeError::InvalidNodeCapacity { node_capacity: 0 })
    ));
    let zero_depth = Config {
        max_depth: 0,
        ..Config::default()
    };
    assert!(matches!(
        QuadTree::new_with_config(world(), zero_depth),
        Err(QuadtreeError::InvalidMaxDepth { max_depth: 0 })
    ));
}

#[test]
fn test_depth_beyond_key_budget_is_only_a_warning() {
    let config = Config {
        max_depth: 12,
        ..Config::default()
    };
    assert!(config.exceeds_key_budget());
    assert_eq!(config.clamped_depth().max_depth, MAX_KEY_DEPTH);
    assert!(!config.clamped_depth().exceeds_key_budget());

    let qt = QuadTree::new_with_config(world(), config).unwrap();
    assert_eq!(qt.max_depth(), 12);
}

#[test]
fn test_offset_world() {
    let bounds = Rectangle::new(500.0, 500.0, 1000.0, 1000.0);
    let mut rng = StdRng::seed_from_u64(31);
    let positions = random_positions(&mut rng, 300, &bounds);
    let mut qt = QuadTree::new_with_config(
        bounds,
        Config {
            max_entities: 300,
            node_capacity: 2,
            max_depth: 8,
        },
    ).unwrap();
    qt.rebuild(&positions, 0..300);

    assert_eq!(qt.bounds(), bounds);
    assert_eq!(sorted(qt.query(&bounds).unwrap()), (0..300).collect::<Vec<u32>>());
    assert!(qt
        .query(&Rectangle::new(-500.0, -500.0, 100.0, 100.0))
        .unwrap()
        .is_empty());
}

#[test]
fn test_node_bounding_boxes_for_overlay() {
    let mut rng = StdRng::seed_from_u64(41);
    let positions = random_positions(&mut rng, 200, &world());
    let qt = build(
        Config {
            max_entities: 200,
            node_capacity: 2,
            max_depth: 6,
        },
        &positions,
    );

    let mut boxes = Vec::new();
    qt.all_node_bounding_boxes(&mut boxes);
    assert_eq!(boxes.len(), qt.stats().populated_cells);
    for rect in boxes {
        assert!(world().contains_rectangle(&rect));
    }

    for cell in qt.populated_cells() {
        assert_eq!(cell.bounds, qt.geometry().rectangle_of(cell.key));
        assert_eq!(cell.depth, cell.key.depth());
    }
}

#[test]
fn test_rebuild_replaces_previous_content() {
    let mut rng = StdRng::seed_from_u64(43);
    let first = random_positions(&mut rng, 300, &world());
    let second = random_positions(&mut rng, 120, &world());
    let mut qt = build(Config::default(), &first);

    qt.rebuild(&second, 0..120);
    assert_eq!(qt.len(), 120);
    assert_eq!(sorted(qt.query(&world()).unwrap()), (0..120).collect::<Vec<u32>>());
}

#[test]
fn test_tuple_positions() {
    let positions: Vec<(f32, f32)> = vec![(-10.0, -10.0), (10.0, 10.0)];
    let mut qt = QuadTree::new(world()).unwrap();
    qt.rebuild(&positions, [1, 0]);
    assert_eq!(
        qt.query(&Rectangle::new(10.0, 10.0, 2.0, 2.0)).unwrap(),
        vec![1]
    );
}

#[test]
fn test_background_rebuild_matches_inline() {
    let mut rng = StdRng::seed_from_u64(51);
    let positions = Arc::new(random_positions(&mut rng, 1000, &world()));
    let config = Config {
        max_entities: 1000,
        node_capacity: 4,
        max_depth: 8,
    };

    let inline = build(config.clone(), &positions);

    let mut driver = RebuildDriver::new(QuadTree::new_with_config(world(), config).unwrap());
    driver
        .rebuild_in_background(positions.clone(), (0..1000).collect()).unwrap();
    assert!(driver.is_building());

    let area = Rectangle::new(-10.0, 5.0, 30.0, 20.0);
    let tree = driver.complete().unwrap();
    assert_eq!(
        sorted(tree.query(&area).unwrap()),
        sorted(inline.query(&area).unwrap())
    );
    assert_eq!(tree.stats(), inline.stats());
    assert!(!driver.is_building());

    // Back to back: the second rebuild waits for the first
    driver
        .rebuild_in_background(positions.clone(), (0..500).collect()).unwrap();
    driver
        .rebuild_in_background(positions.clone(), (0..250).collect()).unwrap();
    assert_eq!(driver.complete().unwrap().len(), 250);

    let tree = driver.rebuild_inline(&*positions, 0..1000).unwrap();
    assert_eq!(tree.len(), 1000);

    let tree = driver.into_tree().unwrap();
    assert_eq!(tree.len(), 1000);
}

#[test]
fn test_background_rebuild_panic_is_reported() {
    let positions = Arc::new(vec![Point::new(1.0, 1.0)]);
    let mut driver = RebuildDriver::new(QuadTree::new(world()).unwrap());

    // Index 5 is out of range for the position store
    driver.rebuild_in_background(positions, vec![0, 5]).unwrap();
    assert!(matches!(
        driver.complete(),
        Err(QuadtreeError::RebuildWorkerPanicked)
    ));
    assert!(matches!(
        driver.complete(),
        Err(QuadtreeError::TreeUnavailable)
    ));
}

#[test]
fn test_pending_rebuild_wait() {
    let positions: Arc<[Point]> = Arc::from(vec![Point::new(-1.0, 2.0), Point::new(3.0, -4.0)]);
    let pending = QuadTree::new(world())
        .unwrap()
        .spawn_rebuild(positions, vec![0, 1]).unwrap();
    let tree = pending.wait().unwrap();
    assert_eq!(sorted(tree.query(&world()).unwrap()), vec![0, 1]);
}

#[test]
fn test_pending_rebuild_reports_finished() {
    let positions = Arc::new(vec![Point::new(-1.0, 2.0), Point::new(3.0, -4.0)]);
    let pending = QuadTree::new(world())
        .unwrap()
        .spawn_rebuild(positions, vec![0, 1]).unwrap();
    while !pending.is_finished() {
        std::thread::yield_now();
    }
    assert!(pending.is_finished());
    assert_eq!(pending.wait().unwrap().len(), 2);
}

#[test]
fn test_parallel_queries_share_one_tree() {
    let mut rng = StdRng::seed_from_u64(61);
    let positions = random_positions(&mut rng, 3000, &world());
    let qt = build(Config::default(), &positions);

    let areas: Vec<Rectangle> = (0..8)
        .map(|_| {
            Rectangle::new(
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0),
                rng.gen_range(1.0..40.0),
                rng.gen_range(1.0..40.0),
            )
        })
        .collect();
    let expected: Vec<Vec<u32>> = areas
        .iter()
        .map(|area| sorted(qt.query(area).unwrap()))
        .collect();

    let tree = &qt;
    let results: Vec<Vec<u32>> = std::thread::scope(|scope| {
        let handles: Vec<_> = areas
            .iter()
            .map(|area| scope.spawn(move || sorted(tree.query(area).unwrap())))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });
    assert_eq!(results, expected);
}

#[test]
fn test_query_box_is_open() {
    let positions = vec![Point::new(0.0, 10.0), Point::new(2.0, 10.0)];
    let qt = build(Config::default(), &positions);

    // Entity 0 sits on the center line, so it belongs to the left half
    let area = Rectangle::from_min_max(0.0, 5.0, 5.0, 15.0);
    assert!(area.contains_point(0.0, 10.0));
    assert_eq!(qt.query(&area).unwrap(), vec![1]);

    // A zero-size box on a cell edge overlaps neither side
    assert!(qt
        .query(&Rectangle::new(0.0, 10.0, 0.0, 0.0))
        .unwrap()
        .is_empty());

    // Widening past the edge picks it up
    let widened = Rectangle::from_min_max(-0.1, 5.0, 5.0, 15.0);
    assert_eq!(sorted(qt.query(&widened).unwrap()), vec![0, 1]);
}
