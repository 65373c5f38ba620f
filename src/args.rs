use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};

use crate::db::Iban;

/// Import bank CSV exports into a local database of monthly account chunks.
#[derive(Parser, Debug)]
pub struct Args {
    /// Directory the database is stored in
    #[clap(long, global = true, env = "MONEYDB_DIR", default_value = ".runtime/db")]
    pub db_dir: PathBuf,

    /// Database name. If given, the database is created if it doesn't exist yet
    /// and renamed if it has a different name.
    #[clap(long, global = true, env = "MONEYDB_NAME")]
    pub name: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a new database in the database directory
    Init,

    /// Import bank CSV exports into the database
    Import {
        #[clap(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print name, groups and stored months of the database
    Info,

    /// Print the entries of one account for one month
    ListEntries { iban: Iban, month: YearMonth },

    /// Add a group, given as ordered ID=NAME members
    AddGroup {
        #[clap(required = true, value_parser = parse_group_member)]
        members: Vec<(String, String)>,
    },

    /// Serve the database read-only over HTTP
    Serve {
        #[clap(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
        address: IpAddr,

        #[clap(long, default_value_t = 8080)]
        port: u16,
    },
}

/// A month given as `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("Expected YYYY-MM but got {s:?}");
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse().map_err(|_| invalid())?;
        let month = month.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Ok(Self { year, month })
    }
}

fn parse_group_member(s: &str) -> Result<(String, String), String> {
    let (id, name) = s
        .split_once('=')
        .ok_or_else(|| format!("Expected ID=NAME but got {s:?}"))?;
    if id.is_empty() {
        return Err(format!("Missing group member id in {s:?}"));
    }
    Ok((id.to_string(), name.to_string()))
}

pub fn parse() -> Args {
    Args::parse()
}
