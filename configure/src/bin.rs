use std::{io, process};

use env_logger::Env;
use structopt::StructOpt;
use trsync_config_core::error::Error;
use trsync_configure::{opt::Opt, run};

fn main_() -> anyhow::Result<()> {
    let opt = Opt::from_args();
    let stdout = io::stdout();
    run::run(opt, &mut stdout.lock())
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if let Err(error) = main_() {
        if let Some(error) = error.downcast_ref::<Error>() {
            eprintln!("{}", error.category());
        }
        eprintln!("Error: {:#}", error);
        process::exit(1);
    }
}
