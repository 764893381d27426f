use heat_fvm::{CellTopology, FvmResult, Simulation, SimulationConfig};

/// Built-in problem: aluminium bar heated at x = 0, cooled by convection at x = L
const DEFAULT_CONFIG: &str = r#"
[domain]
x = [0.0, 0.5]
y = [0.0, 0.05]
z = [0.0, 0.05]
divisions = [20, 2, 2]

[material]
name = "aluminium"
[material.properties.thermal_conductivity]
base_value = 205.0
method = "linear"
coefficients = [-2.0e-4]
[material.properties.specific_heat]
base_value = 900.0
[material.properties.density]
base_value = 2700.0

[boundary]
ambient_temperature = 293.15

[[boundary.conditions]]
axis = "x"
coordinate = 0.0
kind = "temperature"
value = [373.15]

[[boundary.conditions]]
axis = "x"
coordinate = 0.5
kind = "convective"
value = [25.0]

[solver]
method = "bicgstab"
tolerance = 1e-10

[time]
scheme = "implicit"
time_step = 30.0
steps = 20
initial_temperature = 293.15
"#;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> FvmResult<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading configuration from {}", path);
            SimulationConfig::from_file(&path)?
        }
        None => {
            log::info!("No configuration given, running the built-in aluminium bar");
            SimulationConfig::from_toml_str(DEFAULT_CONFIG)?
        }
    };

    let sim = Simulation::from_config(&config)?;
    let mesh = sim.mesh();
    log::info!(
        "Mesh: {}D, {} points, {} cells, {} faces",
        mesh.dimension(),
        mesh.num_points(),
        mesh.num_cells(),
        mesh.num_faces()
    );

    let result = sim.run()?;

    let total_iterations: usize = result.history.iter().map(|s| s.iterations).sum();
    let fields = result.fields();
    let (t_min, t_max) = fields
        .cell_field("temperature")
        .map_or((f64::NAN, f64::NAN), |f| (f.min(), f.max()));
    let t_mean = result.cell_temperature.iter().sum::<f64>() / result.cell_temperature.len() as f64;

    log::info!("Finished at t = {:.1} s after {} steps", result.final_time(), result.history.len());
    log::info!("  Solver iterations: {}", total_iterations);
    log::info!("  Cell temperature: min {:.2} K, max {:.2} K, mean {:.2} K", t_min, t_max, t_mean);

    Ok(())
}
