//! Predictive vs. direct tracking of the default reference motion
//! Run with: cargo run --example compare_strategies
//! Set RUST_LOG=arm_tracking=debug to see fit diagnostics.

use arm_tracking::{Joint, LoopDriver, Strategy, TrackingBuilder};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let sim = TrackingBuilder::<f64>::new()
        .window_size(50)
        .dt(0.05)
        .harmonics(3)
        .noise_level(0.05)
        .seed(42)
        .build()
        .expect("valid tracking configuration");

    let mut driver = LoopDriver::new(sim);
    driver.set_running(true);

    println!("Time(s) | Elbow ref | Elbow direct | Elbow predictive");
    println!("--------|-----------|--------------|-----------------");

    for tick in 1..=200 {
        let Some(outcome) = driver.step() else {
            break;
        };

        if tick % 20 == 0 {
            println!(
                "{:7.2} | {:9.2} | {:12.2} | {:16.2}",
                outcome.time,
                outcome.reference[Joint::Elbow],
                outcome.direct[Joint::Elbow],
                outcome.predictive[Joint::Elbow],
            );
        }

        if tick % 40 == 0 {
            if let Some(snapshot) = driver.trajectory().snapshot() {
                println!(
                    "        mean RMSE  predictive {:.2}°  direct {:.2}°",
                    snapshot.mean_rmse(Strategy::Predictive),
                    snapshot.mean_rmse(Strategy::Direct)
                );
            }
        }
    }

    // Stop, inspect the state, then resume with a noisier sensor.
    driver.set_running(false);
    let sim = driver.trajectory_mut();
    if let Some(snapshot) = sim.snapshot() {
        println!("\n{snapshot}");
    }
    println!("\n{}", sim.diagnostics());

    if let Some(pose) = sim.endpoints(Strategy::Predictive) {
        println!(
            "\nPredictive end effector at ({:.3}, {:.3})",
            pose.end.x, pose.end.y
        );
    }

    sim.set_noise_level(0.15).expect("non-negative noise level");
    driver.set_running(true);
    let ran = driver.run_ticks(100);
    if let Some(snapshot) = driver.trajectory().snapshot() {
        println!("\nAfter {ran} more ticks at 15% noise:\n{snapshot}");
    }
}
