/// Steady 1D slab with uniform heat source: grid convergence against the analytic parabola

use heat_fvm::{
    assemble, Axis, BoundaryConditionStore, CellTopology, ConjugateGradient, FvmResult,
    Material, MaterialProperty, Mesh1D, Solver, ValueArity,
};
use heat_fvm::physics::{DENSITY, SPECIFIC_HEAT, THERMAL_CONDUCTIVITY};

fn analytical_solution(x: f64, lx: f64, t_left: f64, t_right: f64, k: f64, q: f64) -> f64 {
    let linear = t_left + (t_right - t_left) * (x / lx);
    let source_term = (q / (2.0 * k)) * x * (lx - x);
    linear + source_term
}

fn main() -> FvmResult<()> {
    println!("=== 1D Slab with Heat Source: Grid Convergence ===\n");

    let lx = 600.0;
    let t_left = 1280.0;
    let t_right = 0.0;
    let conductivity = 3.0;
    let heat_source = 1e-3;

    let material = Material::new("crust")
        .with_property(THERMAL_CONDUCTIVITY, MaterialProperty::constant(conductivity))
        .with_property(SPECIFIC_HEAT, MaterialProperty::constant(1000.0))
        .with_property(DENSITY, MaterialProperty::constant(3300.0));

    println!("Problem: steady-state conduction with volumetric source");
    println!("  k = {}, Q = {:.2e}", conductivity, heat_source);
    println!("  BC: T(x=0) = {} °C, T(x={}) = {} °C\n", t_left, lx, t_right);

    let mut previous: Option<(f64, f64)> = None;

    for nx in [10, 20, 40, 80, 160] {
        let mesh = Mesh1D::build((0.0, lx), nx, 1.0)?;

        let mut store = BoundaryConditionStore::new(mesh.num_cells(), ValueArity::Scalar);
        store.apply_by_coordinate(&mesh, Axis::X, 0.0, &[t_left], 1e-6)?;
        store.apply_by_coordinate(&mesh, Axis::X, lx, &[t_right], 1e-6)?;
        store.set_uniform_sources(0.0, 0.0, heat_source);

        let old = vec![0.0; mesh.num_cells()];
        let system = assemble(&mesh, &material, &store, &old, f64::INFINITY, 1.0)?;

        let mut solver = ConjugateGradient::new()
            .with_max_iterations(5000)
            .with_tolerance(1e-12);
        let (t_fvm, stats) = solver.solve(&system.matrix, &system.rhs)?;

        let max_error = t_fvm
            .iter()
            .enumerate()
            .map(|(c, &t)| {
                let x = mesh.cell_center(c).x;
                (t - analytical_solution(x, lx, t_left, t_right, conductivity, heat_source)).abs()
            })
            .fold(0.0, f64::max);

        let dx = mesh.spacing();
        print!(
            "  nx = {:4}  dx = {:8.3}  iterations = {:4}  max error = {:.4e} °C",
            nx, dx, stats.iterations, max_error
        );
        if let Some((prev_dx, prev_error)) = previous {
            let order = (prev_error / max_error).ln() / (prev_dx / dx).ln();
            print!("  order = {:.2}", order);
        }
        println!();

        previous = Some((dx, max_error));
    }

    println!("\n=== Benchmark Complete ===");
    Ok(())
}
