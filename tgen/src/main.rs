mod msg;
mod print;

use clap::Parser;
use log::LevelFilter;

use msg::Msg;
use tgen::{rk16, Generator, Options, Template};

#[derive(Parser, Debug)]
#[clap(
    name = "RK16 Test Generator",
    author = "kanade-k-1228",
    version = "v1.0.0",
    about = "Template-driven test program generator for RK16 ISA"
)]
struct Args {
    #[arg(default_value = "template.yaml")]
    template: String,

    #[arg(short, long)]
    options: Option<String>,

    #[arg(short, long)]
    seed: Option<u64>,

    #[arg(long)]
    no_presim: bool,

    #[arg(long)]
    self_checks: bool,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let args = Args::parse();

    let mut logger = env_logger::Builder::from_default_env();
    match args.verbose {
        0 => {}
        1 => {
            logger.filter_level(LevelFilter::Debug);
        }
        _ => {
            logger.filter_level(LevelFilter::Trace);
        }
    }
    logger.init();

    println!("RK16 Test Generator by kanade-k-1228");
    if let Err(err) = run(&args) {
        Msg::Error(err.to_string()).print_at(&args.template);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> tgen::Result<()> {
    let mut options = match &args.options {
        Some(fname) => Options::load(fname)?,
        None => Options::default(),
    };
    if let Some(seed) = args.seed {
        options.seed = seed;
    }
    if args.no_presim {
        options.presimulation = false;
    }
    if args.self_checks {
        options.self_checks = true;
    }

    let mut ctx = rk16::context(options);
    let template = Template::load(&args.template, ctx.model.as_ref())?;
    template.install(&mut ctx);

    let mut generator = Generator::new(ctx);
    let sequences = generator.run_block(&template.root)?;
    for seq in &sequences {
        print::print_sequence(seq);
    }
    match sequences.len() {
        0 => Msg::Warn("no sequence generated".to_string()).print(),
        n => Msg::Note(format!("{n} sequence(s) generated")).print(),
    }
    Ok(())
}
