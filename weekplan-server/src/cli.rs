use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;

use chrono::NaiveDate;
use getopts::Options;

pub struct Args {
    pub address: SocketAddr,
    pub file: PathBuf,
    pub week_start: Option<NaiveDate>,
    pub save_on_exit: bool,
}

fn opts() -> Options {
    let mut opts = Options::new();
    opts.optflag(
        "h",
        "help",
        concat!("Print the help output of ", env!("CARGO_PKG_NAME")),
    );
    opts.optopt(
        "a",
        "address",
        "Socket address (IP and port) to listen on [Default: 127.0.0.1:8080]",
        "SOCKET_ADDRESS",
    );
    opts.optopt(
        "f",
        "file",
        "File the schedule is loaded from and saved to [Default: schedule.json]",
        "PATH",
    );
    opts.optopt(
        "w",
        "week-start",
        "Monday of the week to plan, required when no schedule file exists",
        "YYYY-MM-DD",
    );
    opts.optflag(
        "s",
        "save-on-exit",
        "Save the schedule when shutting down [Default: false]",
    );
    opts
}

pub fn parse(args: Vec<String>) -> Args {
    let opts = opts();

    let matches = match opts.parse(args) {
        Ok(matches) => matches,
        Err(fail) => {
            eprintln!("{fail}");
            process::exit(1);
        }
    };

    if matches.opt_present("help") {
        println!("{}", opts.usage(&opts.short_usage(env!("CARGO_PKG_NAME"))));
        process::exit(0);
    }

    let address = match matches.opt_get_default("address", SocketAddr::from(([127, 0, 0, 1], 8080)))
    {
        Ok(address) => address,
        Err(err) => {
            eprintln!("Provided value for option 'address' is invalid: {err}");
            process::exit(1);
        }
    };

    let file = matches
        .opt_str("file")
        .map_or_else(|| PathBuf::from("schedule.json"), PathBuf::from);

    let week_start = match matches.opt_get::<NaiveDate>("week-start") {
        Ok(week_start) => week_start,
        Err(err) => {
            eprintln!("Provided value for option 'week-start' is invalid: {err}");
            process::exit(1);
        }
    };

    let save_on_exit = matches.opt_present("save-on-exit");

    Args {
        address,
        file,
        week_start,
        save_on_exit,
    }
}
