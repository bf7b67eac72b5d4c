// SerCom - Interactive serial terminal
use anyhow::{Context, Result};
use clap::Parser;
use sercom::cli::args::Args;
use sercom::cli::banner;
use sercom::core::session::{LoopExit, Session};
use sercom::infrastructure::config::ConfigManager;
use sercom::infrastructure::console::Console;
use sercom::infrastructure::lock::UucpLock;
use sercom::infrastructure::term::{TermControl, TermiosPort};
use sercom::infrastructure::{logging, signals};
use std::io::Write;
use std::time::Duration;

fn main() {
    let args = Args::parse();
    match run(args) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            // Endpoint handles have been dropped by now, so the console is
            // back in cooked mode and this prints legibly.
            eprintln!();
            eprintln!("FATAL: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> Result<i32> {
    logging::init_logging(args.verbose)?;

    if args.list {
        banner::list_ports()?;
        return Ok(0);
    }

    let file_config = match &args.config {
        Some(path) => ConfigManager::load_from_path(path)?,
        None => ConfigManager::new()?.load()?,
    };
    let settings = args.into_settings(file_config)?;

    banner::print_banner(&settings);

    let shutdown = signals::install().context("cannot install signal handlers")?;

    let _lock = if settings.no_lock {
        None
    } else {
        Some(UucpLock::acquire(&settings.port).context("cannot lock device")?)
    };

    let mut port = TermiosPort::open(&settings)
        .with_context(|| format!("cannot open {}", settings.port.display()))?;
    port.apply()
        .with_context(|| format!("cannot configure {}", settings.port.display()))?;

    let mut console = Console::new().context("cannot set console to raw mode")?;
    console.write_all(b"Terminal ready\r\n")?;

    let mut session = Session::new(settings.clone(), port);
    let exit = session.run(&mut console, &shutdown)?;

    console.write_all(b"\r\n")?;
    if settings.no_reset || exit == LoopExit::SkipReset {
        console.write_all(b"Skipping device reset...\r\n")?;
        session.device_mut().forget_original();
    }
    console.write_all(b"Thanks for using sercom\r\n")?;
    // Give the last bytes a moment to drain before modes are restored.
    std::thread::sleep(Duration::from_secs(1));

    Ok(match exit {
        LoopExit::Terminated => 1,
        _ => 0,
    })
}
