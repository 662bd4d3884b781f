use std::fs;

use anyhow::Context;
use clap::Parser;
use log::info;

use fugacity::Interpreter;

#[derive(Parser, Debug)]
#[clap(name = "fugacity")]
#[clap(version)]
#[clap(about = "A flat-histogram Monte Carlo engine for molecular thermodynamics", long_about = None)]
struct Args {
    /// directive script to execute, one directive per line
    #[clap(short = 'f', long)]
    input: String,
    /// seed for the simulation's random stream; entropy-seeded if absent
    #[clap(short, long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    println!("fugacity {}", env!("CARGO_PKG_VERSION"));

    let script = fs::read_to_string(&args.input)
        .with_context(|| format!("can't open the directive script {}", args.input))?;
    let mut interpreter = Interpreter::new(args.seed);
    interpreter.run_script(&script)?;

    if let Some(mc) = interpreter.monte_carlo() {
        info!("finished after {} attempts", mc.num_attempts());
        println!("attempts: {}", mc.num_attempts());
        println!("energy: {:.10}", mc.criterion().current_energy());
    }
    Ok(())
}
