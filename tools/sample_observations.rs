//! Sample Observation Generator
//!
//! Prints synthetic route observations as JSON lines, suitable for piping
//! into `route-catch`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use route_catch_pipeline::Observation;
use std::io::{self, BufWriter, Write};
use tracing::info;

/// Route labels known to the bundled label mapping
const MAPPED_ROUTES: &[&str] = &[
    "ANGLE", "CORNER", "CROSS", "FLAT", "GO", "HITCH", "IN", "OUT", "POST", "SCREEN", "SLANT",
    "WHEEL",
];

/// Labels that only resolve through the "undefined" fallback
const UNMAPPED_ROUTES: &[&str] = &["DRAG", "SEAM", "SWING"];

/// Observation generator for exercising the scorer
struct ObservationGenerator {
    rng: StdRng,
    play_counter: u64,
}

impl ObservationGenerator {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            play_counter: 0,
        }
    }

    fn generate(&mut self, unmapped_rate: f64) -> Observation {
        self.play_counter += 1;

        let down = self.rng.gen_range(1..=4) as f64;
        let yards_to_go = self.rng.gen_range(1..=20) as f64;
        let air_yards: f64 = self.rng.gen_range(-3.0..35.0);
        let separation: f64 = self.rng.gen_range(0.0..6.0);
        let speed: f64 = self.rng.gen_range(4.0..10.5);

        let mut obs = Observation::new()
            .with("play_id", format!("play_{:06}", self.play_counter))
            .with("game_id", 2023090700 + self.rng.gen_range(0..272) as i64)
            .with("down", down)
            .with("yards_to_go", yards_to_go)
            .with("air_yards", (air_yards * 10.0).round() / 10.0)
            .with("defender_separation", (separation * 100.0).round() / 100.0)
            .with("receiver_speed", (speed * 100.0).round() / 100.0);

        if self.rng.gen_bool(unmapped_rate) {
            obs.insert("route", self.random_choice(UNMAPPED_ROUTES));
        } else if self.rng.gen_bool(0.1) {
            // Some upstream exports carry the route already encoded
            obs.insert("route", self.rng.gen_range(0..MAPPED_ROUTES.len()) as f64);
        } else {
            obs.insert("route", self.random_choice(MAPPED_ROUTES));
        }

        obs
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_observations=info".parse()?),
        )
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let count: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(100);
    let unmapped_rate: f64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(0.05);
    let seed: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(42);

    info!(
        count = count,
        unmapped_rate = unmapped_rate,
        seed = seed,
        "Generating sample observations"
    );

    let mut generator = ObservationGenerator::new(seed);
    let mut out = BufWriter::new(io::stdout().lock());

    for _ in 0..count {
        let obs = generator.generate(unmapped_rate.clamp(0.0, 1.0));
        serde_json::to_writer(&mut out, &obs)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    info!(count = count, "Completed");
    Ok(())
}
