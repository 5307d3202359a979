//! # rArping
//!
//! `rarping` sends ARP requests to a neighbour host and reports its answers.
extern crate rArping;
use rArping::config::{load_config, CConfig};
use rArping::constants::*;
use rArping::debug::{print_debug, Verbose};
use rArping::{run, Config};

// getopts
use getopts::Options;

// std
use std::env;
use std::error::Error;
use std::str::FromStr;

/// MyError Type
#[derive(Debug)]
struct MyError(String);

impl std::fmt::Display for MyError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}: {}", RARPING_PROG, self.0)
    }
}
impl Error for MyError {}

/// Command-line Action Enumerator
#[derive(Debug)]
enum Action {
    Probe(CliOpts),
    Usage,
    Version,
}

/// Command-line Options Structure
///
/// Options left unset fall back to the configuration file.
#[derive(Debug)]
struct CliOpts {
    cfg: Config,
    interval: Option<u64>,
    debug: Option<u8>,
    conf: Option<String>,
}

// cli_options() function
fn cli_options() -> Options {
    let mut opts = Options::new();
    opts.optflag("f", "", "quit on first reply");
    opts.optflag("q", "", "be quiet");
    opts.optflag("b", "", "keep on broadcasting, do not unicast");
    opts.optflag("D", "", "duplicate address detection mode");
    opts.optflag("U", "", "unsolicited ARP mode, update your neighbours");
    opts.optflag("A", "", "ARP answer mode, update your neighbours");
    opts.optflag("V", "", "print version and exit");
    opts.optflag("h", "", "display help information");
    opts.optopt("c", "", "how many packets to send", "COUNT");
    opts.optopt("w", "", "how long to wait for a reply", "TIMEOUT");
    opts.optopt(
        "i",
        "",
        "set interval between packets (default: 1 second)",
        "INTERVAL",
    );
    opts.optopt("I", "", "which ethernet device to use", "DEVICE");
    opts.optopt("s", "", "source ip address", "SOURCE");
    opts.optopt(
        "d",
        "",
        "debugging level:\n0(none), 1(low), 2(medium), 3(high), 5(extensive)",
        "LEVEL",
    );
    opts.optopt("C", "", "path to configuration file", "FILE");
    opts
}

// print_usage() function
fn print_usage(program: &str) {
    let brief = format!("Usage: {} [options] <destination>", program);
    eprint!("{}", cli_options().usage(&brief));
}

// numeric_opt() function
fn numeric_opt<T: FromStr>(matches: &getopts::Matches, opt: &str) -> Result<Option<T>, MyError> {
    match matches.opt_str(opt) {
        Some(s) => match s.parse::<T>() {
            Ok(v) => Ok(Some(v)),
            Err(_) => Err(MyError(format!("invalid argument to -{}: {}", opt, s))),
        },
        None => Ok(None),
    }
}

// parse_cli_opts() function
fn parse_cli_opts(args: &[String]) -> Result<Action, MyError> {
    let matches = match cli_options().parse(&args[1..]) {
        Ok(m) => m,
        Err(f) => return Err(MyError(f.to_string())),
    };

    if matches.opt_present("h") {
        return Ok(Action::Usage);
    }
    if matches.opt_present("V") {
        return Ok(Action::Version);
    }
    if matches.free.len() != 1 {
        return Ok(Action::Usage);
    }

    let mut cfg = Config::new(matches.free[0].clone());

    // mode flags
    cfg.modes.broadcast_only = matches.opt_present("b");
    cfg.modes.quiet = matches.opt_present("q");
    cfg.modes.quit_on_reply = matches.opt_present("f");
    if matches.opt_present("D") {
        cfg.modes.dad = true;
        cfg.modes.quit_on_reply = true;
    }
    cfg.modes.unsolicited = matches.opt_present("U");
    if matches.opt_present("A") {
        cfg.modes.advert = true;
        cfg.modes.unsolicited = true;
    }

    if let Some(count) = numeric_opt::<i32>(&matches, "c")? {
        cfg.count = count;
    }
    if let Some(timeout) = numeric_opt::<i32>(&matches, "w")? {
        cfg.timeout = timeout;
    }
    let interval = numeric_opt::<u64>(&matches, "i")?;
    if interval == Some(0) {
        return Err(MyError("interval must be at least 1 second".to_string()));
    }
    cfg.iface = matches.opt_str("I").filter(|s| !s.is_empty());
    cfg.source = matches.opt_str("s");

    Ok(Action::Probe(CliOpts {
        cfg,
        interval,
        debug: numeric_opt::<u8>(&matches, "d")?,
        conf: matches.opt_str("C"),
    }))
}

// merge_config() function
/// Complete the command-line settings with the configuration file ones.
fn merge_config(cli: CliOpts, file: &CConfig) -> Result<Config, Box<dyn Error>> {
    let mut cfg = cli.cfg;
    let level = cli.debug.unwrap_or_else(|| file.debug());
    cfg.debug = Verbose::new(level, file.time_zone(), file.time_format());
    if cfg.iface.is_none() {
        cfg.iface = file.interface().map(|s| s.to_string());
    }
    cfg.interval = match cli.interval {
        Some(i) => i,
        None => file.interval()?,
    };
    cfg.discovery = file.discovery()?;
    Ok(cfg)
}

// main() function
fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let cli = match parse_cli_opts(&args) {
        Ok(Action::Probe(cli)) => cli,
        Ok(Action::Version) => {
            println!("{} {} ({})", RARPING_PROG, RARPING_VERSION, RARPING_HOMEPAGE);
            std::process::exit(0);
        }
        Ok(Action::Usage) => {
            print_usage(&program);
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("{}", e);
            print_usage(&program);
            std::process::exit(2);
        }
    };

    let file = match load_config(cli.conf.as_ref().map(|s| &s[..])) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{}: {}", RARPING_PROG, e);
            std::process::exit(2);
        }
    };
    let cfg = match merge_config(cli, &file) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", RARPING_PROG, e);
            std::process::exit(2);
        }
    };
    print_debug(
        &cfg.debug,
        DEBUG_LEVEL_HIGH,
        DEBUG_SRC_CONFIG,
        format!("{:?}", cfg),
    );

    match run(&cfg) {
        Ok(status) => std::process::exit(status),
        Err(e) => {
            if e.interface_state() {
                if !cfg.modes.quiet {
                    println!("{}", e);
                }
            } else {
                eprintln!("{}: {}", RARPING_PROG, e);
                if let rArping::error::Error::NoSuitableDevice = e {
                    print_usage(&program);
                }
            }
            std::process::exit(e.exit_code());
        }
    }
}
