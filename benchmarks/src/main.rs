mod swarm;

use anyhow::{ensure, Context};
use clap::Parser;
use common::shapes::{Circle, Point, Rectangle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sparse_quadtree::quadtree::{Config, QuadTree, RebuildDriver, MAX_KEY_DEPTH};
use std::time::{Duration, Instant};
use swarm::{Swarm, ZapOutcome};
use tracing_subscriber::EnvFilter;

/// Drives a swarm of enemies towards the world center, rebuilding the index every
/// tick and zapping them with radius shots.
#[derive(Parser, Debug)]
#[command(name = "swarm", about = "Tick-loop driver for the sparse quadtree")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Number of ticks to simulate
    #[arg(short, long, default_value_t = 600)]
    ticks: usize,

    /// RNG seed
    #[arg(short, long, default_value_t = 36207250)]
    seed: u64,

    /// Most enemies alive at once; also sizes the index tables
    #[arg(long, default_value_t = 10_000)]
    max_entities: usize,

    /// Enemies placed on the spawn ring before the first tick
    #[arg(long, default_value_t = 100)]
    start_entities: usize,

    /// Enemies added each tick until the swarm is full
    #[arg(long, default_value_t = 20)]
    spawn_per_tick: usize,

    #[arg(long, default_value_t = 10)]
    max_depth: usize,

    #[arg(long, default_value_t = 5)]
    node_capacity: usize,

    /// Side length of the square world centered on the origin
    #[arg(long, default_value_t = 10.0)]
    world_size: f32,

    #[arg(long, default_value_t = 4.0)]
    spawn_radius: f32,

    #[arg(long, default_value_t = 1.0)]
    speed: f32,

    /// Relative spread of enemy speeds around `speed`
    #[arg(long, default_value_t = 0.2)]
    speed_variance: f32,

    #[arg(long, default_value_t = 1.0)]
    zap_radius: f32,

    #[arg(long, default_value_t = 0.05)]
    zap_damage: f32,

    #[arg(long, default_value_t = 4)]
    zaps_per_tick: usize,

    /// Simulated seconds per tick
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// Rebuild on a worker thread and fence before the next tick's queries
    #[arg(long)]
    background: bool,

    /// Cross-check every zap against a brute-force scan
    #[arg(long)]
    verify: bool,

    /// Log a progress line every this many ticks
    #[arg(long, default_value_t = 100)]
    report_every: usize,
}

#[derive(Default)]
struct Timings {
    fence: Duration,
    zap: Duration,
    step: Duration,
    rebuild: Duration,
}

#[derive(Default)]
struct Totals {
    candidates: usize,
    hits: usize,
    killed: usize,
    spawned: usize,
}

impl Totals {
    fn add(&mut self, outcome: ZapOutcome) {
        self.candidates += outcome.candidates;
        self.hits += outcome.hits;
    }
}

fn ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

fn random_zap(rng: &mut StdRng, spawn_radius: f32, zap_radius: f32) -> Circle {
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    let distance = rng.gen_range(0.0..=spawn_radius);
    Circle::new(angle.cos() * distance, angle.sin() * distance, zap_radius)
}

fn zap_tick(
    cli: &Cli,
    tree: &QuadTree,
    swarm: &mut Swarm,
    rng: &mut StdRng,
    candidates: &mut Vec<u32>,
    totals: &mut Totals,
) -> anyhow::Result<()> {
    for _ in 0..cli.zaps_per_tick {
        let zap = random_zap(rng, cli.spawn_radius, cli.zap_radius);
        candidates.clear();
        tree.query_circle(&zap, candidates)?;
        if cli.verify {
            verify_zap(swarm, &zap, candidates)?;
        }
        totals.add(swarm.zap(&zap, cli.zap_damage, candidates));
    }
    totals.killed += swarm.remove_dead();
    Ok(())
}

fn verify_zap(swarm: &Swarm, zap: &Circle, candidates: &[u32]) -> anyhow::Result<()> {
    let mut unique = candidates.to_vec();
    unique.sort_unstable();
    unique.dedup();
    ensure!(
        unique.len() == candidates.len(),
        "broad phase returned duplicates for {:?}",
        zap
    );
    for index in swarm.brute_force_hits(zap) {
        ensure!(
            unique.binary_search(&index).is_ok(),
            "broad phase missed entity {} at {:?} for {:?}",
            index,
            swarm.positions()[index as usize],
            zap
        );
    }
    Ok(())
}

/// Rejects settings that would put enemies outside the indexed world or alias keys.
fn check_settings(cli: &Cli) -> anyhow::Result<()> {
    ensure!(
        cli.max_depth <= MAX_KEY_DEPTH,
        "--max-depth {} exceeds the deepest addressable level {}",
        cli.max_depth,
        MAX_KEY_DEPTH
    );
    ensure!(
        cli.spawn_radius >= 0.0 && cli.spawn_radius <= cli.world_size * 0.5,
        "--spawn-radius {} must lie within the world (at most half of --world-size {})",
        cli.spawn_radius,
        cli.world_size
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    run(&cli)
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    check_settings(cli)?;

    let world = Rectangle::new(0.0, 0.0, cli.world_size, cli.world_size);
    let config = Config {
        max_entities: cli.max_entities,
        node_capacity: cli.node_capacity,
        max_depth: cli.max_depth,
    };
    let tree = QuadTree::new_with_config(world, config).context("building the quadtree")?;
    let mut driver = RebuildDriver::new(tree);

    let mut rng = StdRng::seed_from_u64(cli.seed);
    let mut swarm = Swarm::new(cli.max_entities, cli.speed, cli.speed_variance);
    swarm.spawn_ring(&world, cli.spawn_radius, cli.start_entities, &mut rng);
    driver.rebuild_inline(&**swarm.positions(), swarm.live())?;

    tracing::info!(
        ticks = cli.ticks,
        entities = swarm.len(),
        background = cli.background,
        "starting swarm"
    );

    let mut timings = Timings::default();
    let mut totals = Totals::default();
    let mut candidates = Vec::with_capacity(1024);
    let run_start = Instant::now();

    for tick in 0..cli.ticks {
        let start = Instant::now();
        let tree = driver.complete()?;
        timings.fence += start.elapsed();

        let start = Instant::now();
        zap_tick(cli, tree, &mut swarm, &mut rng, &mut candidates, &mut totals)?;
        timings.zap += start.elapsed();

        let start = Instant::now();
        swarm.step_towards(Point::ZERO, cli.dt);
        for _ in 0..cli.spawn_per_tick {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            if !swarm.spawn(world.point_on_ring(cli.spawn_radius, angle), &mut rng) {
                break;
            }
            totals.spawned += 1;
        }
        timings.step += start.elapsed();

        let start = Instant::now();
        if cli.background {
            driver.rebuild_in_background(swarm.positions().clone(), swarm.live().collect())?;
        } else {
            driver.rebuild_inline(&**swarm.positions(), swarm.live())?;
        }
        timings.rebuild += start.elapsed();

        if cli.report_every > 0 && (tick + 1) % cli.report_every == 0 {
            let stats = driver.complete()?.stats();
            tracing::info!(
                tick = tick + 1,
                alive = swarm.len(),
                cells = stats.populated_cells,
                deepest = stats.deepest_depth,
                subdivisions = stats.subdivisions,
                "progress"
            );
        }
    }

    let tree = driver.into_tree()?;
    let stats = tree.stats();
    let ticks = cli.ticks.max(1) as f64;
    println!("swarm: {} ticks in {:.1} ms", cli.ticks, ms(run_start.elapsed()));
    println!(
        "  per tick: fence {:.4} ms, zap {:.4} ms, step {:.4} ms, rebuild {:.4} ms",
        ms(timings.fence) / ticks,
        ms(timings.zap) / ticks,
        ms(timings.step) / ticks,
        ms(timings.rebuild) / ticks
    );
    println!(
        "  zaps: {} candidates, {} hits, {} killed; {} spawned, {} alive",
        totals.candidates,
        totals.hits,
        totals.killed,
        totals.spawned,
        swarm.len()
    );
    println!(
        "  tree: {} entities, {} cells ({} leaves, {} internal), depth {}",
        stats.entities,
        stats.populated_cells,
        stats.leaf_cells,
        stats.internal_cells,
        stats.deepest_depth
    );
    if cli.verify {
        println!("  verify: broad phase covered every exact hit");
    }
    Ok(())
}
