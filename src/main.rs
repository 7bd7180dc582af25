//! Entry point: CLI contract (spec.md §6), startup sequence, and the main
//! event loop. Mirrors the shape of `blinklad-rdwm`'s `Rdwm::init`/`run`/
//! `main`, but delegates the actual work to `Wm`/`events::handle` instead of
//! inlining it here.

#[macro_use]
extern crate log;

mod atoms;
mod bar;
mod client;
mod commands;
mod config;
mod draw;
mod error;
mod events;
mod focus;
mod geometry;
mod layout;
mod monitor;
mod os;
mod wm;
mod xconn;

use std::env;
use std::process::ExitCode;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_usage() {
    eprintln!("usage: ridgewm [-v]");
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    match args.len() {
        1 => {}
        2 if args[1] == "-v" => {
            eprintln!("ridgewm-{}", VERSION);
            return ExitCode::FAILURE;
        }
        _ => {
            print_usage();
            return ExitCode::FAILURE;
        }
    }

    env_logger::Builder::from_default_env().write_style(env_logger::WriteStyle::Auto).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), error::WmError> {
    let config_path = config::default_config_path();
    let config = config::Config::load(Some(&config_path))?;
    commands::validate_all(&config)?;

    os::install_sigchld_handler();
    os::pledge();

    let mut wm = wm::Wm::new(config)?;
    wm.grab_keys();
    wm.scan();

    info!("ridgewm-{} running", VERSION);

    while wm.running {
        let ev = wm.xconn.next_event();
        events::handle(&mut wm, &ev);
    }

    Ok(())
}
