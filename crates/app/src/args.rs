//! Hand-rolled command-line parsing.

use std::fmt;

use diy_core::catalog::CatalogQuery;
use diy_core::forms::{LoginDraft, RegistrationDraft};
use diy_core::model::{Theme, TutorialId};

pub const DEFAULT_DB_URL: &str = "sqlite://diy.sqlite3";

#[derive(Debug)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { what: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidValue { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { what } => write!(f, "missing {what}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidValue { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeAction {
    Show,
    Toggle,
    Set(Theme),
}

#[derive(Debug)]
pub enum Command {
    Tutorials(CatalogQuery),
    Show(TutorialId),
    Learn(TutorialId),
    Login(LoginDraft),
    Register(RegistrationDraft),
    Logout,
    WhoAmI,
    MyLearning,
    Theme(ThemeAction),
    Help,
}

#[derive(Debug)]
pub struct Args {
    /// Overrides `DIY_API_BASE_URL` when set.
    pub api_url: Option<String>,
    pub db_url: String,
    pub command: Command,
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  diy tutorials   [--search <q>] [--category <c>] [--progress all|ongoing|completed]");
    eprintln!("                  [--difficulty pemula|menengah|mahir] [--sort newest|oldest|duration-short|duration-long]");
    eprintln!("  diy show <tutorial_id>");
    eprintln!("  diy learn <tutorial_id>      # n next, p previous, j <k> jump, c complete, q quit");
    eprintln!("  diy login --email <e> --password <p>");
    eprintln!("  diy register --name <n> --username <u> --email <e> --password <p> --confirm-password <p>");
    eprintln!("               --karang-taruna <n> --provinsi <p> --kabupaten-kota <k> --kecamatan <k> --jalan <j>");
    eprintln!("               [--phone <p>] [--interest <i>]... [--skill-level <s>] [--peran <r>]");
    eprintln!("  diy logout | whoami | my-learning");
    eprintln!("  diy theme [toggle|light|dark]");
    eprintln!();
    eprintln!("Global flags:");
    eprintln!("  --api <base_url>   (default from DIY_API_BASE_URL / DIY_ENV)");
    eprintln!("  --db <sqlite_url>  (default {DEFAULT_DB_URL})");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  DIY_API_BASE_URL, DIY_ENV, DIY_API_TIMEOUT_SECS, DIY_DB_URL, RUST_LOG");
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_value<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<T, ArgsError> {
    let raw = require_value(args, flag)?;
    raw.parse()
        .map_err(|_| ArgsError::InvalidValue { flag, raw })
}

fn parse_tutorial_id(raw: Option<String>) -> Result<TutorialId, ArgsError> {
    let raw = raw.ok_or(ArgsError::MissingArgument {
        what: "tutorial id",
    })?;
    raw.parse().map_err(|_| ArgsError::InvalidValue {
        flag: "tutorial id",
        raw,
    })
}

impl Args {
    /// Parse `argv` without the program name.
    ///
    /// # Errors
    ///
    /// Returns `ArgsError` for unknown subcommands, unknown flags or
    /// malformed values.
    pub fn parse(argv: impl IntoIterator<Item = String>) -> Result<Self, ArgsError> {
        let mut api_url = None;
        let mut db_url = std::env::var("DIY_DB_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);

        // Global flags may appear anywhere; everything else is handed to
        // the subcommand parser in order.
        let mut rest = Vec::new();
        let mut iter = argv.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--api" => api_url = Some(require_value(&mut iter, "--api")?),
                "--db" => {
                    let value = require_value(&mut iter, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                _ => rest.push(arg),
            }
        }

        let mut rest = rest.into_iter();
        let command = match rest.next().as_deref() {
            None | Some("--help" | "-h" | "help") => Command::Help,
            Some("tutorials") => Command::Tutorials(parse_query(&mut rest)?),
            Some("show") => Command::Show(parse_tutorial_id(rest.next())?),
            Some("learn") => Command::Learn(parse_tutorial_id(rest.next())?),
            Some("login") => Command::Login(parse_login(&mut rest)?),
            Some("register") => Command::Register(parse_registration(&mut rest)?),
            Some("logout") => Command::Logout,
            Some("whoami") => Command::WhoAmI,
            Some("my-learning") => Command::MyLearning,
            Some("theme") => Command::Theme(parse_theme(rest.next())?),
            Some(other) => return Err(ArgsError::UnknownCommand(other.to_owned())),
        };
        if let Some(extra) = rest.next() {
            return Err(ArgsError::UnknownArg(extra));
        }

        Ok(Self {
            api_url,
            db_url,
            command,
        })
    }
}

fn parse_query(args: &mut impl Iterator<Item = String>) -> Result<CatalogQuery, ArgsError> {
    let mut query = CatalogQuery::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--search" => query.search = require_value(args, "--search")?,
            "--category" => query.category = Some(require_value(args, "--category")?),
            "--progress" => query.progress = parse_value(args, "--progress")?,
            "--difficulty" => {
                let raw = require_value(args, "--difficulty")?;
                query.difficulty = if raw.eq_ignore_ascii_case("all") {
                    None
                } else {
                    Some(raw.parse().map_err(|_| ArgsError::InvalidValue {
                        flag: "--difficulty",
                        raw,
                    })?)
                };
            }
            "--sort" => query.sort = parse_value(args, "--sort")?,
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }
    Ok(query)
}

fn parse_login(args: &mut impl Iterator<Item = String>) -> Result<LoginDraft, ArgsError> {
    let mut draft = LoginDraft::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--email" => draft.email = require_value(args, "--email")?,
            "--password" => draft.password = require_value(args, "--password")?,
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }
    Ok(draft)
}

fn parse_registration(
    args: &mut impl Iterator<Item = String>,
) -> Result<RegistrationDraft, ArgsError> {
    let mut draft = RegistrationDraft::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--name" => draft.name = require_value(args, "--name")?,
            "--username" => draft.username = require_value(args, "--username")?,
            "--email" => draft.email = require_value(args, "--email")?,
            "--password" => draft.password = require_value(args, "--password")?,
            "--confirm-password" => {
                draft.confirm_password = require_value(args, "--confirm-password")?;
            }
            "--karang-taruna" => {
                draft.karang_taruna_name = require_value(args, "--karang-taruna")?;
            }
            "--provinsi" => draft.provinsi = require_value(args, "--provinsi")?,
            "--kabupaten-kota" => draft.kabupaten_kota = require_value(args, "--kabupaten-kota")?,
            "--kecamatan" => draft.kecamatan = require_value(args, "--kecamatan")?,
            "--jalan" => draft.jalan = require_value(args, "--jalan")?,
            "--phone" => draft.phone = require_value(args, "--phone")?,
            "--interest" => draft.interests.push(require_value(args, "--interest")?),
            "--skill-level" => draft.skill_level = require_value(args, "--skill-level")?,
            "--peran" => draft.peran_anggota = require_value(args, "--peran")?,
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }
    Ok(draft)
}

fn parse_theme(arg: Option<String>) -> Result<ThemeAction, ArgsError> {
    match arg.as_deref() {
        None => Ok(ThemeAction::Show),
        Some("toggle") => Ok(ThemeAction::Toggle),
        Some(raw) => raw
            .parse()
            .map(ThemeAction::Set)
            .map_err(|_| ArgsError::InvalidValue {
                flag: "theme",
                raw: raw.to_owned(),
            }),
    }
}

pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

#[cfg(test)]
mod tests {
    use diy_core::catalog::SortKey;
    use diy_core::model::{Difficulty, ProgressFilter};

    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        Args::parse(args.iter().map(|s| (*s).to_owned()))
    }

    #[test]
    fn tutorials_flags() {
        let args = parse(&[
            "tutorials",
            "--search",
            "keran",
            "--progress",
            "ongoing",
            "--difficulty",
            "pemula",
            "--sort",
            "duration-long",
            "--db",
            "sqlite::memory:",
        ])
        .unwrap();
        assert_eq!(args.db_url, "sqlite::memory:");
        let Command::Tutorials(query) = args.command else {
            panic!("expected tutorials command");
        };
        assert_eq!(query.search, "keran");
        assert_eq!(query.progress, ProgressFilter::Ongoing);
        assert_eq!(query.difficulty, Some(Difficulty::Pemula));
        assert_eq!(query.sort, SortKey::DurationLong);
    }

    #[test]
    fn global_flags_anywhere() {
        let args = parse(&["--api", "http://10.0.2.2:5000/api", "learn", "abc"]).unwrap();
        assert_eq!(args.api_url.as_deref(), Some("http://10.0.2.2:5000/api"));
        assert!(matches!(args.command, Command::Learn(ref id) if id.as_str() == "abc"));
    }

    #[test]
    fn register_collects_interests() {
        let args = parse(&[
            "register",
            "--name",
            "Sari",
            "--interest",
            "Listrik",
            "--interest",
            "Plambing",
        ])
        .unwrap();
        let Command::Register(draft) = args.command else {
            panic!("expected register command");
        };
        assert_eq!(draft.interests, vec!["Listrik", "Plambing"]);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(parse(&["fly"]), Err(ArgsError::UnknownCommand(_))));
        assert!(matches!(parse(&["show"]), Err(ArgsError::MissingArgument { .. })));
        assert!(matches!(
            parse(&["tutorials", "--sort", "popular"]),
            Err(ArgsError::InvalidValue { flag: "--sort", .. })
        ));
        assert!(matches!(parse(&["login", "--email"]), Err(ArgsError::MissingValue { .. })));
        assert!(matches!(parse(&["theme", "blue"]), Err(ArgsError::InvalidValue { .. })));
        assert!(matches!(parse(&["whoami", "now"]), Err(ArgsError::UnknownArg(_))));
    }

    #[test]
    fn theme_actions() {
        assert!(matches!(parse(&["theme"]).unwrap().command, Command::Theme(ThemeAction::Show)));
        assert!(matches!(
            parse(&["theme", "dark"]).unwrap().command,
            Command::Theme(ThemeAction::Set(Theme::Dark))
        ));
    }

    #[test]
    fn relative_db_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/diy.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/diy.sqlite3"));
    }
}
