use std::process;

use env_logger::Env;
use log::error;

use filtersnp::params::{parse_args, usage, version, Invocation};

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "filtersnp".to_string());

    let params = match parse_args(args) {
        Ok(Invocation::Run(params)) => params,
        Ok(Invocation::Help) => {
            print!("{}", usage(&program));
            process::exit(1);
        }
        Ok(Invocation::Version) => {
            print!("{}", version());
            process::exit(1);
        }
        Err(e) => {
            error!("{}", e);
            if e.shows_usage() {
                print!("{}", usage(&program));
            }
            process::exit(1);
        }
    };

    if let Err(e) = filtersnp::run(&params) {
        error!("{:#}", e);
        process::exit(1);
    }
}
