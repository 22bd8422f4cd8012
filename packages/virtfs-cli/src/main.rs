use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use virtfs::{Config, DriverKind, MountMatch};

mod commands;

/// virtfs - browse and configure the Linux virtual filesystems
#[derive(Parser, Debug)]
#[command(name = "virtfs")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Mount table to resolve filesystems from
    #[arg(long, global = true)]
    mounts: Option<PathBuf>,

    /// Directory for staging atomic writes
    #[arg(long, global = true)]
    scratch: Option<PathBuf>,

    /// JSON config file (flags take precedence)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Match filesystems on the fs-type column only
    #[arg(long, global = true)]
    strict_mounts: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show where each filesystem is mounted
    Mounts,
    /// List a directory (always live)
    Ls {
        fs: Fs,
        #[arg(default_value = "")]
        path: String,
        /// Print the listing as a JSON array
        #[arg(long)]
        json: bool,
    },
    /// Print a file
    Cat { fs: Fs, path: String },
    /// Atomically write a value to a writable file
    Set {
        fs: Fs,
        path: String,
        value: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Fs {
    Sysfs,
    Procfs,
    Configfs,
}

impl From<Fs> for DriverKind {
    fn from(fs: Fs) -> Self {
        match fs {
            Fs::Sysfs => DriverKind::SysFs,
            Fs::Procfs => DriverKind::ProcFs,
            Fs::Configfs => DriverKind::ConfigFs,
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> virtfs::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env(),
    };
    if let Some(mounts) = &args.mounts {
        config = config.with_mounts_path(mounts);
    }
    if let Some(scratch) = &args.scratch {
        config = config.with_scratch_root(scratch);
    }
    if args.strict_mounts {
        config = config.with_mount_match(MountMatch::FsType);
    }
    Ok(config)
}

fn run(args: Args) -> commands::Result<()> {
    let config = load_config(&args)?;
    let mut out = std::io::stdout().lock();

    match args.command {
        Command::Mounts => commands::mounts(&config, &mut out),
        Command::Ls { fs, path, json } => commands::ls(&config, fs.into(), &path, json, &mut out),
        Command::Cat { fs, path } => commands::cat(&config, fs.into(), &path, &mut out),
        Command::Set { fs, path, value } => {
            commands::set(&config, fs.into(), &path, &value, &mut out)
        }
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
