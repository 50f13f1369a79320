use rocketflight::data::DataTypeCatalog;
use rocketflight::io::csv;
use rocketflight::vehicle::{
    DeploymentTrigger, IgnitionTrigger, Motor, MotorMount, RecoveryDevice, RocketBuilder,
    SeparationTrigger, StageBuilder,
};
use rocketflight::{FlightDataType, SimulationConditions, SimulationEngine};

fn main() {
    // -----------------------------------------------------------------------
    // Vehicle: "Pathfinder-2" two-stage sounding rocket
    // -----------------------------------------------------------------------
    let rocket = RocketBuilder::new("Pathfinder-2")
        .stage(
            StageBuilder::new("Sustainer")
                .dry_mass(0.55)
                .length(0.9)
                .diameter(0.066)
                .cd(0.32)
                .cg(0.55)
                .cp(0.72)
                .longitudinal_inertia(0.045)
                .rotational_inertia(0.0004)
                .fins(3, 0.009)
                .body_tube_area(0.059)
                .motor_mount(
                    MotorMount::new(
                        Motor::constant("F32", 32.0, 1.6, 0.030).with_ejection_delay(6.0),
                    )
                    .ignition(IgnitionTrigger::Automatic, 0.0),
                )
                .recovery_device(
                    RecoveryDevice::parachute("Main", 0.45)
                        .deploy_on(DeploymentTrigger::EjectionCharge, 0.0),
                )
                .build(),
        )
        .stage(
            StageBuilder::new("Booster")
                .dry_mass(0.30)
                .length(0.4)
                .diameter(0.066)
                .cd(0.38)
                .cg(0.20)
                .cp(0.32)
                .longitudinal_inertia(0.012)
                .rotational_inertia(0.0002)
                .fins(3, 0.012)
                .body_tube_area(0.026)
                .motor_mount(
                    MotorMount::new(Motor::constant("E28", 28.0, 1.0, 0.018))
                        .ignition(IgnitionTrigger::Launch, 0.0),
                )
                .separation(SeparationTrigger::CurrentStageBurnout, 0.0)
                .build(),
        )
        .build();

    let conditions = SimulationConditions {
        launch_rod_length: 1.2,
        ..SimulationConditions::default()
    };

    // -----------------------------------------------------------------------
    // Run simulation
    // -----------------------------------------------------------------------
    let mut engine = SimulationEngine::new(conditions);
    let flight = match engine.simulate(&rocket) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("simulation failed: {e}");
            std::process::exit(1);
        }
    };
    let summary = flight.summary();

    // -----------------------------------------------------------------------
    // Print results
    // -----------------------------------------------------------------------
    println!();
    println!("====================================================================");
    println!("  ROCKET FLIGHT SIMULATION — {}", rocket.name);
    println!("====================================================================");
    println!();

    for branch in flight.branches() {
        println!("  Flight Events — branch '{}'", branch.name());
        println!("  ──────────────────────────────────────────────────────────────────");
        for event in branch.events() {
            let altitude = branch
                .value_at_time(FlightDataType::Altitude, event.time)
                .unwrap_or(0.0);
            println!("  {:<28} t={:>7.2}s   alt={:>8.1}m", event.kind.to_string(), event.time, altitude);
        }
        println!();
    }

    println!("  Performance Summary");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Max altitude:  {:>8.0} m   ({:.2} km)",
        summary.max_altitude,
        summary.max_altitude / 1000.0
    );
    println!(
        "  Max speed:     {:>8.1} m/s (Mach {:.2})",
        summary.max_velocity, summary.max_mach
    );
    println!(
        "  Max accel:     {:>8.1} m/s^2 ({:.1} g)",
        summary.max_acceleration,
        summary.max_acceleration / 9.80665
    );
    if let Some(t) = summary.time_to_apogee {
        println!("  Apogee at:     {:>8.1} s", t);
    }
    if let Some(v) = summary.deployment_velocity {
        println!("  Deploy vel:    {:>8.1} m/s", v);
    }
    if let Some(t) = summary.flight_time {
        println!("  Flight time:   {:>8.1} s", t);
    }
    if let Some(v) = summary.ground_hit_velocity {
        println!("  Landing vel:   {:>8.1} m/s", v);
    }
    println!();

    if !flight.warnings().is_empty() {
        println!("  Warnings");
        println!("  ──────────────────────────────────────────────────────────────────");
        for warning in flight.warnings().iter() {
            println!("  - {warning}");
        }
        println!();
    }

    // -----------------------------------------------------------------------
    // Export the primary branch
    // -----------------------------------------------------------------------
    let catalog = DataTypeCatalog::new();
    if let Some(branch) = flight.branch(0) {
        match csv::write_branch_file("flight.csv", branch, &catalog) {
            Ok(()) => println!("  Primary branch written to flight.csv"),
            Err(e) => eprintln!("  CSV export failed: {e}"),
        }
    }
    println!("====================================================================");
    println!();
}
