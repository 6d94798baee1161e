//! Headless flyby: generate a star system, pick a telluric planet and
//! approach it from orbit, watching the LOD pipeline refine the surface.
//!
//! ```sh
//! cargo run --example flyby -- 42
//! ```

use std::time::Duration;

use glam::DVec3;
use tellus::{ChunkForge, PlanetTerrain, TerrainProfile, TerrainSettings, TrackingRenderer};
use tellus_orrery::{BodyKind, Properties, StarSystem};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let seed = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => 42,
    };

    let system = StarSystem::generate(seed);
    let Some(planet_id) = system
        .planets()
        .iter()
        .copied()
        .find(|&id| system.body(id).kind == BodyKind::Telluric)
    else {
        println!("seed {seed} produced no telluric planet; try another seed");
        return Ok(());
    };

    let planet = system.body(planet_id);
    let Properties::Telluric {
        terrain_seed,
        roughness,
        ..
    } = planet.properties
    else {
        unreachable!("telluric body carries telluric properties");
    };
    println!(
        "seed {seed}: telluric planet radius {:.0} km, orbit radius {:.2e} m",
        planet.radius / 1000.0,
        planet.orbit.radius
    );

    let profile = TerrainProfile {
        seed: terrain_seed,
        amplitude: planet.radius * 0.003 * (0.5 + roughness),
        ..TerrainProfile::default()
    };

    let mut renderer = TrackingRenderer::new();
    let mut forge = ChunkForge::for_this_machine()?;
    let mut terrain = PlanetTerrain::new(
        planet.radius,
        profile,
        TerrainSettings::default(),
        &mut forge,
        &mut renderer,
    )?;
    terrain.set_position(system.body_position(planet_id, 0.0));

    // Descend from 20 radii to just above the surface.
    let ticks = 600;
    for tick in 0..ticks {
        let t = f64::from(tick) / f64::from(ticks - 1);
        let altitude = 20.0 * (1.0 - t) + 1.02 * t;
        let observer = terrain.position() + DVec3::X * planet.radius * altitude;

        terrain.update(observer, &mut forge, &mut renderer);
        forge.update(&mut renderer);

        // Stand in for frame time; gives the workers room to finish.
        std::thread::sleep(Duration::from_millis(2));

        if tick % 100 == 0 || tick == ticks - 1 {
            let stats = forge.stats();
            println!(
                "tick {tick:4}  altitude {altitude:6.2} R  chunks {:4} ({} ready)  \
                 pending {:3}  busy {}  visible {}",
                stats.chunks,
                stats.ready_chunks,
                stats.pending_tasks,
                stats.busy_workers,
                renderer.visible_count(),
            );
        }
    }

    terrain.dispose(&mut forge, &mut renderer);
    println!("done; meshes created over the run: {}", renderer.created_count());
    Ok(())
}
