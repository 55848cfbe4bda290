use std::path::Path;
use std::{env, process};

use tracing_subscriber::EnvFilter;

mod cli;
mod os;
mod output;
mod steps;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(args: cli::Args) -> anyhow::Result<()> {
    if let Some(dirs) = &args.relative {
        let [from, to] = dirs.as_slice() else {
            anyhow::bail!("-R takes two directories");
        };
        let relative = makedep::path::Path::from(from.as_str()).relative_to_dir(to);
        println!("{}", relative.as_deref().unwrap_or("."));
        return Ok(());
    }

    output::install_signal_handler()?;

    let steps = steps::Steps::default();
    let mut makedep = makedep::Makedep::new(os::Os, steps.clone());
    makedep.makefile(args.makefile.as_str());
    if let Ok(flags) = env::var("MAKEFLAGS") {
        makedep.makeflags(&flags);
    }
    for assignment in args.assignments {
        makedep.variable(assignment.name, assignment.value);
    }
    makedep.generate()?;

    let makefile = Path::new(&args.makefile);
    if output::update(makefile, &steps.take())? {
        tracing::info!("updated {}", makefile.display());
    }
    Ok(())
}

fn main() {
    init_logging();
    let args = cli::parse();
    if let Err(err) = run(args) {
        eprintln!("{err:#}");
        process::exit(1);
    }
}
