//! Sortie headless demo
//!
//! Generates a seeded level, flies the scripted path through it and logs
//! contacts and landings.
//!
//! Usage: `sortie [seed] [ticks] [settings.json]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use sortie::CollisionSettings;
    use sortie::consts::SIM_DT;
    use sortie::sim::{FlightStats, MovementController, generate};

    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let seed = parse_arg(&args, 0, 1u64);
    let ticks = parse_arg(&args, 1, 3600u64);
    let settings = match args.get(2) {
        Some(path) => CollisionSettings::load(path),
        None => {
            log::info!("Using default settings");
            CollisionSettings::default()
        }
    };

    log::info!("Sortie starting: seed {}, {} ticks", seed, ticks);

    let mut scenario = generate(seed, &settings);
    let mut controller = MovementController::new(settings.controller_params());

    let mut stats = FlightStats::default();
    for _ in 0..ticks {
        let outcome = scenario.step(&mut controller, SIM_DT);
        stats.record(&outcome);
        if outcome.just_landed {
            log::info!(
                "Tick {}: landed on {:?} at {:?}",
                scenario.tick(),
                outcome.platform,
                scenario.agent.position
            );
        }
    }

    let grid = scenario.world.broadphase();
    log::info!(
        "Broad-phase: {} obstacles over {} cells ({} cell entries)",
        grid.len(),
        grid.cell_count(),
        grid.entry_count()
    );

    println!("seed {} / {} ticks ({:.1}s)", seed, stats.ticks, stats.ticks as f32 * SIM_DT);
    println!("  final position   {:?}", scenario.agent.position);
    println!("  collisions       {}", stats.collisions);
    println!("  support ticks    {}", stats.support_ticks);
    println!("  terrain contacts {}", stats.terrain_contacts);
    println!("  slope projections {}", stats.slope_projections);
    println!("  landings         {}", stats.landings);
    println!("  bounds clamps    {}", stats.bounds_hits);

    scenario.world.unload();
}

#[cfg(not(target_arch = "wasm32"))]
fn parse_arg<T: std::str::FromStr>(args: &[String], index: usize, default: T) -> T {
    match args.get(index) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("Ignoring bad argument {:?}", raw);
            default
        }),
        None => default,
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Library-only on wasm; the demo is native
}
