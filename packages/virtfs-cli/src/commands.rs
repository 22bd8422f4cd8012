//! Subcommand implementations. Output goes to the writer passed in.

use std::io::{self, Write};

use virtfs::{Config, Driver, DriverKind, Node};

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Virtfs(#[from] virtfs::Error),
    #[error("{0} is not mounted")]
    NotMounted(DriverKind),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
    #[error("failed to encode listing: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;

fn driver(config: &Config, kind: DriverKind) -> Result<Driver> {
    Driver::discover(kind, config).ok_or(CliError::NotMounted(kind))
}

fn node<'a>(driver: &'a mut Driver, path: &str) -> Result<&'a mut Node> {
    Ok(driver.walk(path)?)
}

pub fn mounts(config: &Config, out: &mut impl Write) -> Result<()> {
    for kind in DriverKind::ALL {
        match kind.resolve(config) {
            Some(root) => writeln!(out, "{}\t{}", kind, root.display())?,
            None => writeln!(out, "{}\tunknown", kind)?,
        }
    }
    Ok(())
}

pub fn ls(
    config: &Config,
    kind: DriverKind,
    path: &str,
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let mut driver = driver(config, kind)?;
    let names = node(&mut driver, path)?.list_children()?;

    if json {
        serde_json::to_writer_pretty(&mut *out, &names)?;
        writeln!(out)?;
    } else {
        for name in names {
            writeln!(out, "{}", name)?;
        }
    }
    Ok(())
}

pub fn cat(config: &Config, kind: DriverKind, path: &str, out: &mut impl Write) -> Result<()> {
    let mut driver = driver(config, kind)?;
    let contents = node(&mut driver, path)?.contents()?;
    out.write_all(contents.as_bytes())?;
    Ok(())
}

pub fn set(
    config: &Config,
    kind: DriverKind,
    path: &str,
    value: &str,
    out: &mut impl Write,
) -> Result<()> {
    let mut driver = driver(config, kind)?;
    let leaf = node(&mut driver, path)?.set(value)?;
    tracing::debug!("wrote {}", leaf.path().display());
    writeln!(out, "{}", leaf)?;
    Ok(())
}
