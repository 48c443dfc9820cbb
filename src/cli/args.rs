use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Log home sensor readings and summarize them",
    long_about = "homelog stores timestamped readings per named stream (pool, demand, \
battery, klgb, ...) and answers min / average / max / count / latest over the last \
24 hours or a calendar day.\n\n\
Run `homelog serve` on the logging host; every other command talks to that server \
over HTTP (see [client] in the config file)."
)]
pub struct Cli {
    /// Path to the TOML config file (default: ./homelog.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the logging server
    Serve {
        /// Override the configured bind address, e.g. 0.0.0.0:8080
        #[arg(long)]
        bind: Option<String>,
    },
    /// Print the current value of a stream straight from its collector
    Sample { stream: String },
    /// Send one reading to the server
    Log {
        stream: String,
        /// Value to log; read from the stream's collector when omitted
        #[arg(long, allow_hyphen_values = true)]
        value: Option<f64>,
    },
    /// Most recent reading of a stream
    Latest { stream: String },
    /// Minimum over the last 24 hours or a day
    Min(StreamDay),
    /// Maximum over the last 24 hours or a day
    Max(StreamDay),
    /// Average over the last 24 hours or a day
    Avg(StreamDay),
    /// Number of readings of one stream
    Count(StreamDay),
    /// Min, average, max and latest in one line
    Summary(StreamDay),
    /// Every reading in the window, oldest first
    Data(StreamDay),
    /// Readings logged across all streams
    Status {
        #[arg(long)]
        day: Option<NaiveDate>,
    },
    /// Per-day figures for the last seven days
    Weekly {
        stream: String,
        /// Last day of the week (default: yesterday)
        #[arg(long)]
        end: Option<NaiveDate>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct StreamDay {
    pub stream: String,
    /// Calendar day YYYY-MM-DD instead of the last 24 hours
    #[arg(long)]
    pub day: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_day_scoped_command() {
        let cli = Cli::try_parse_from(["homelog", "avg", "demand", "--day", "2021-06-10"]).unwrap();
        match cli.command {
            Command::Avg(args) => {
                assert_eq!(args.stream, "demand");
                assert_eq!(args.day, NaiveDate::from_ymd_opt(2021, 6, 10));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn negative_values_can_be_logged() {
        let cli = Cli::try_parse_from(["homelog", "log", "klgb", "--value", "-2.5"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Log { value: Some(v), .. } if v == -2.5
        ));
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(Cli::try_parse_from(["homelog", "plot", "pool"]).is_err());
    }

    #[test]
    fn clap_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
