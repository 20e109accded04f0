use crate::config::{RecordOptions, Settings, DEFAULT_ADDRESS, DEFAULT_OUTPUT_DIR};
use crate::doctor::ProbeBudget;
use crate::errors::ArgsError;
use clap::{crate_version, App, AppSettings, Arg, ArgMatches, SubCommand};
use std::ffi::{OsStr, OsString};
use std::num::ParseIntError;
use std::path::PathBuf;
use std::str::FromStr;

/// Which kind of record `generate` writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleKind {
    Account,
    Transfer,
}

impl FromStr for SampleKind {
    type Err = ArgsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "account" => Ok(SampleKind::Account),
            "transfer" => Ok(SampleKind::Transfer),
            other => Err(ArgsError::InvalidKind(other.to_string())),
        }
    }
}

/// A fully validated CLI verb.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    CreateAccount {
        id: u128,
    },
    GetAccount {
        id: u128,
    },
    MigrateAccounts {
        file: PathBuf,
    },
    Transfer {
        debit: u128,
        credit: u128,
        amount: u128,
    },
    BulkTransfer {
        debit: u128,
        credit: u128,
        amount: u128,
        iterations: usize,
    },
    MigrateTransfers {
        file: PathBuf,
    },
    Generate {
        kind: SampleKind,
        number: usize,
    },
    Doctor {
        budget: ProbeBudget,
    },
}

#[derive(Debug)]
pub struct Args {
    pub settings: Settings,
    pub command: Command,
}

impl Args {
    pub fn parse() -> Result<Self, ArgsError> {
        Self::parse_from(std::env::args_os())
    }

    /// Parse and validate `args` (including the program name). Every numeric
    /// value is checked here, before any connection to the cluster is made.
    pub fn parse_from<I, T>(args: I) -> Result<Self, ArgsError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = app().get_matches_from_safe(args)?;

        let (name, sub) = match matches.subcommand() {
            (name, Some(sub)) => (name, sub),
            // SubcommandRequiredElseHelp makes clap report this case itself.
            (_, None) => {
                return Err(ArgsError::Clap(clap::Error::with_description(
                    "a subcommand is required",
                    clap::ErrorKind::MissingSubcommand,
                )))
            }
        };

        let settings = settings(&matches, sub)?;
        let command = command(name, sub)?;
        Ok(Self { settings, command })
    }
}

fn app() -> App<'static, 'static> {
    let account_number = || {
        Arg::with_name("account_number")
            .required(true)
            .index(1)
            .help("numeric account id")
    };
    let json_file = || {
        Arg::with_name("json_file")
            .required(true)
            .index(1)
            .help("path of a JSON array file to read from")
    };
    let transfer_args = || {
        vec![
            Arg::with_name("debit_account")
                .required(true)
                .index(1)
                .help("account to debit"),
            Arg::with_name("credit_account")
                .required(true)
                .index(2)
                .help("account to credit"),
            Arg::with_name("amount")
                .required(true)
                .index(3)
                .help("amount to move"),
        ]
    };

    App::new("tigerbeagle")
        .version(crate_version!())
        .about("TigerBeagle is a CLI tool for TigerBeetle ledger data management")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("tb-address")
                .long("tb-address")
                .takes_value(true)
                .env("TB_ADDRESS")
                .default_value(DEFAULT_ADDRESS)
                .global(true)
                .help("TigerBeetle address"),
        )
        .arg(
            Arg::with_name("cluster-id")
                .long("cluster-id")
                .takes_value(true)
                .default_value("0")
                .global(true)
                .help("TigerBeetle cluster id"),
        )
        .arg(
            Arg::with_name("ledger")
                .long("ledger")
                .takes_value(true)
                .default_value("700")
                .global(true)
                .help("Ledger ID"),
        )
        .arg(
            Arg::with_name("code")
                .long("code")
                .takes_value(true)
                .default_value("10")
                .global(true)
                .help("Account/Transfer code"),
        )
        .arg(
            Arg::with_name("flags")
                .long("flags")
                .takes_value(true)
                .default_value("0")
                .global(true)
                .help("Account/Transfer flags"),
        )
        .arg(
            Arg::with_name("output-dir")
                .long("output-dir")
                .takes_value(true)
                .default_value(DEFAULT_OUTPUT_DIR)
                .global(true)
                .help("directory that generated sample files are written to"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .global(true)
                .help("log more detail to stderr (repeatable)"),
        )
        .subcommand(
            SubCommand::with_name("create-account")
                .about("Create a new account")
                .arg(account_number()),
        )
        .subcommand(
            SubCommand::with_name("get-account")
                .about("Get account details")
                .arg(account_number()),
        )
        .subcommand(
            SubCommand::with_name("migrate-accounts")
                .about("Migrate accounts from a JSON file")
                .arg(json_file()),
        )
        .subcommand(
            SubCommand::with_name("transfer")
                .about("Transfer funds between accounts")
                .args(&transfer_args()),
        )
        .subcommand(
            SubCommand::with_name("bulk-transfer")
                .about("Perform multiple transfers in bulk")
                .args(&transfer_args())
                .arg(
                    Arg::with_name("iterations")
                        .required(true)
                        .index(4)
                        .help("number of transfers to make"),
                ),
        )
        .subcommand(
            SubCommand::with_name("migrate-transfers")
                .about("Migrate transfers from a JSON file")
                .arg(json_file()),
        )
        .subcommand(
            SubCommand::with_name("generate")
                .about("Generate sample JSON files for accounts or transfers")
                .arg(
                    Arg::with_name("type")
                        .required(true)
                        .index(1)
                        .help("account or transfer"),
                )
                .arg(
                    Arg::with_name("number")
                        .required(true)
                        .index(2)
                        .help("number of records to generate"),
                ),
        )
        .subcommand(
            SubCommand::with_name("doctor")
                .about("Validate the connectivity to TigerBeetle")
                .arg(
                    Arg::with_name("attempts")
                        .short("a")
                        .long("attempts")
                        .takes_value(true)
                        .default_value("5")
                        .help("Number of logical attempts (used to calculate total timeout)"),
                )
                .arg(
                    Arg::with_name("timeout-per-attempt")
                        .short("t")
                        .long("timeout-per-attempt")
                        .takes_value(true)
                        .default_value("10")
                        .help("Timeout in seconds per attempt"),
                ),
        )
}

/// Global flags may appear before or after the subcommand; a value given
/// explicitly on the subcommand wins over the top-level one.
fn global_os_value<'a>(top: &'a ArgMatches, sub: &'a ArgMatches, name: &str) -> Option<&'a OsStr> {
    if sub.occurrences_of(name) > 0 {
        sub.value_of_os(name)
    } else {
        top.value_of_os(name)
    }
}

fn global_value<'a>(
    top: &'a ArgMatches,
    sub: &'a ArgMatches,
    name: &'static str,
) -> Result<Option<&'a str>, ArgsError> {
    global_os_value(top, sub, name).map(|v| utf8(name, v)).transpose()
}

fn settings(top: &ArgMatches, sub: &ArgMatches) -> Result<Settings, ArgsError> {
    let mut settings = Settings {
        address: global_value(top, sub, "tb-address")?
            .unwrap_or(DEFAULT_ADDRESS)
            .to_string(),
        output_dir: global_os_value(top, sub, "output-dir")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        verbosity: top.occurrences_of("verbose").max(sub.occurrences_of("verbose")),
        ..Settings::default()
    };

    if let Some(value) = global_value(top, sub, "cluster-id")? {
        settings.cluster_id = parse_number("cluster-id", value)?;
    }
    let mut record = RecordOptions::default();
    if let Some(value) = global_value(top, sub, "ledger")? {
        record.ledger = parse_number("ledger", value)?;
    }
    if let Some(value) = global_value(top, sub, "code")? {
        record.code = parse_number("code", value)?;
    }
    if let Some(value) = global_value(top, sub, "flags")? {
        record.flags = parse_number("flags", value)?;
    }
    settings.record = record;

    Ok(settings)
}

fn command(name: &str, sub: &ArgMatches) -> Result<Command, ArgsError> {
    let command = match name {
        "create-account" => Command::CreateAccount {
            id: required_number(sub, "account_number")?,
        },
        "get-account" => Command::GetAccount {
            id: required_number(sub, "account_number")?,
        },
        "migrate-accounts" => Command::MigrateAccounts {
            file: required_path(sub, "json_file"),
        },
        "transfer" => Command::Transfer {
            debit: required_number(sub, "debit_account")?,
            credit: required_number(sub, "credit_account")?,
            amount: required_number(sub, "amount")?,
        },
        "bulk-transfer" => Command::BulkTransfer {
            debit: required_number(sub, "debit_account")?,
            credit: required_number(sub, "credit_account")?,
            amount: required_number(sub, "amount")?,
            iterations: required_number(sub, "iterations")?,
        },
        "migrate-transfers" => Command::MigrateTransfers {
            file: required_path(sub, "json_file"),
        },
        "generate" => Command::Generate {
            kind: text(sub, "type")?.parse()?,
            number: required_number(sub, "number")?,
        },
        "doctor" => Command::Doctor {
            budget: ProbeBudget {
                attempts: positive_number(sub, "attempts")?,
                timeout_per_attempt: positive_number(sub, "timeout-per-attempt")?,
            },
        },
        other => return Err(ArgsError::InvalidKind(other.to_string())),
    };

    Ok(command)
}

fn parse_number<T>(name: &'static str, value: &str) -> Result<T, ArgsError>
where
    T: FromStr<Err = ParseIntError>,
{
    value.parse().map_err(|source| ArgsError::InvalidArgument {
        name,
        value: value.to_string(),
        source,
    })
}

fn required_number<T>(matches: &ArgMatches, name: &'static str) -> Result<T, ArgsError>
where
    T: FromStr<Err = ParseIntError>,
{
    parse_number(name, text(matches, name)?)
}

fn positive_number(matches: &ArgMatches, name: &'static str) -> Result<u64, ArgsError> {
    match required_number::<u64>(matches, name)? {
        0 => Err(ArgsError::ZeroNotAllowed { name }),
        n => Ok(n),
    }
}

/// Paths are taken as raw OS strings; they need not be valid UTF-8.
fn required_path(matches: &ArgMatches, name: &str) -> PathBuf {
    matches.value_of_os(name).map(PathBuf::from).unwrap_or_default()
}

fn text<'a>(matches: &'a ArgMatches, name: &'static str) -> Result<&'a str, ArgsError> {
    // clap has already enforced presence of required positionals.
    matches
        .value_of_os(name)
        .map_or(Ok(""), |value| utf8(name, value))
}

fn utf8<'a>(name: &'static str, value: &'a OsStr) -> Result<&'a str, ArgsError> {
    value.to_str().ok_or_else(|| ArgsError::InvalidUtf8 {
        name,
        value: value.to_string_lossy().into_owned(),
    })
}
