use clap::Parser;
use log::info;
use nalgebra::Vector3;
use rand::distributions::Uniform;
use rand_distr::Distribution;

use rust_breakup::{
    periodic_energy, read_breakup_config, BreakupBasis, BreakupConfig, Coulomb, EwaldHandler,
    Lattice, LongRangeHandler, LongRangeSplit, LpqhiBasis, PotentialConfig, Result,
    TargetFunction, Yukawa,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.yml")]
    config: String,

    /// Also evaluate the energy of this many random unit charges.
    #[arg(short, long, default_value_t = 0)]
    particles: usize,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let config = read_breakup_config(&args.config)?;
    let lattice = config.lattice()?;
    info!("read {} (volume {:.6})", args.config, lattice.volume());

    match config.potential {
        PotentialConfig::Coulomb => {
            let handler = build_handler(&config, &lattice, Coulomb)?;
            report(&handler, &lattice, args.particles)?;

            // Gaussian split at a comparable accuracy as a reference
            let alpha = 3.5 / handler.rc();
            let ewald = EwaldHandler::new(&lattice, alpha, 12.0 * alpha)?;
            println!("Ewald Madelung constant: {:.10}", ewald.madelung_constant());
        }
        PotentialConfig::Yukawa { kappa } => {
            let handler = build_handler(&config, &lattice, Yukawa::new(kappa))?;
            report(&handler, &lattice, args.particles)?;
        }
    }
    Ok(())
}

fn build_handler<F: TargetFunction>(
    config: &BreakupConfig,
    lattice: &Lattice,
    target: F,
) -> Result<LongRangeHandler<F, LpqhiBasis>> {
    let rc = config.rc(lattice);
    let basis = LpqhiBasis::new(rc, config.num_knots)?;
    LongRangeHandler::new(lattice, target, basis, config.breakup)
}

fn report<F: TargetFunction, B: BreakupBasis>(
    handler: &LongRangeHandler<F, B>,
    lattice: &Lattice,
    particles: usize,
) -> Result<()> {
    println!("Optimized breakup");
    println!("----------------------------------------");
    println!("rc = {:.6}, kc = {:.6}", handler.rc(), handler.kc());
    println!("k-vectors: {}", handler.kcontainer().len());
    println!("chi-squared: {:.6e}", handler.chi_squared());
    if handler.fit().dropped_singular_values > 0 {
        println!("dropped singular values: {}", handler.fit().dropped_singular_values);
    }
    println!("coefficients:");
    for (n, t) in handler.coefficients().iter().enumerate() {
        println!("  t[{n:3}] = {t:+.12e}");
    }
    println!("V_L(0) = {:.10}", handler.lr_at_origin());
    println!("V_S(k=0) = {:.10}", handler.sr_k0());
    println!("Madelung constant: {:.10}", handler.madelung_constant());

    if particles > 0 {
        let mut rng = rand::thread_rng();
        let dist = Uniform::new(0.0, 1.0);
        let positions: Vec<Vector3<f64>> = (0..particles)
            .map(|_| {
                let frac = Vector3::new(dist.sample(&mut rng), dist.sample(&mut rng), dist.sample(&mut rng));
                lattice.to_cartesian(&frac)
            })
            .collect();
        let charges = vec![1.0; particles];
        let energy = periodic_energy(handler, lattice, &positions, &charges)?;
        println!("Energy of {particles} random charges: {energy:.10}");
    }
    Ok(())
}
