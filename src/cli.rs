/// CLI argument definitions for the `gitwho` command.
///
/// Every analysis subcommand flattens [`CommonArgs`]; the date and period
/// arguments stay as text and are parsed by the command itself.
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use crate::config::{ConfigFile, Format};
use crate::{changes, timeseries};

/// Top-level CLI parser with a single subcommand selector.
#[derive(Parser)]
#[command(
    name = "gitwho",
    version,
    about = "Who wrote, changed and copied the code in a git repository"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Arguments shared by every analysis command.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Repository to analyze (default: current directory)
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,

    /// Branch to walk (default: main)
    #[arg(long)]
    pub branch: Option<String>,

    /// Only files whose path matches this regex
    #[arg(long)]
    pub files: Option<String>,

    /// Skip files whose path matches this regex
    #[arg(long)]
    pub files_not: Option<String>,

    /// Only authors whose name or email matches this regex
    #[arg(long)]
    pub authors: Option<String>,

    /// Skip authors whose name or email matches this regex
    #[arg(long)]
    pub authors_not: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Full)]
    pub format: Format,

    /// Debug logging and an always-visible progress bar
    #[arg(short, long)]
    pub verbose: bool,

    /// Write span timings to this file
    #[arg(long)]
    pub profile_file: Option<PathBuf>,

    /// Persist results in this JSON file and reuse them on later runs
    #[arg(long)]
    pub cache_file: Option<PathBuf>,

    /// Seconds a cached result stays valid (default: two months)
    #[arg(long)]
    pub cache_ttl: Option<u64>,

    /// Settings file (default: .gitwho.toml in the repository, if present)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl CommonArgs {
    /// Values given on the command line, to be laid over the config file.
    pub fn overrides(&self, min_dup_lines: Option<usize>) -> ConfigFile {
        ConfigFile {
            branch: self.branch.clone(),
            files: self.files.clone(),
            files_not: self.files_not.clone(),
            authors: self.authors.clone(),
            authors_not: self.authors_not.clone(),
            min_dup_lines,
            cache_file: self.cache_file.clone(),
            cache_ttl: self.cache_ttl,
            ..ConfigFile::default()
        }
    }
}

/// All available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Classify the lines changed between two dates
    #[command(long_about = "\
Classify every line changed by the commits between two dates.

Each line added or modified is one of:
  new       -- a line that did not exist before
  refactor  -- rewrites a line older than three weeks
  churn     -- rewrites a line younger than three weeks

Rewrites are split into own lines and lines written by someone else;
the original author of a rewritten line is credited as a helper
(refactor) or churn victim (churn).

Examples:
  gitwho changes                                # last 30 days
  gitwho changes --since \"2024-01-01\" --until \"2024-02-01\"
  gitwho changes --files \"^src/\" --format short")]
    Changes {
        #[command(flatten)]
        common: CommonArgs,

        /// Start of the range, as a date or relative text like "2 weeks ago"
        #[arg(long, default_value = changes::DEFAULT_SINCE)]
        since: String,

        /// End of the range
        #[arg(long, default_value = "now")]
        until: String,
    },

    /// Changes per period, as a table
    #[command(long_about = "\
Split a date range into consecutive periods and classify the changes of
each one. Prints one row per period with the difference to the previous
period and a total row.

Examples:
  gitwho changes-timeseries                          # last 90 days, monthly
  gitwho changes-timeseries --since \"1 year ago\" --period \"1 week\"")]
    ChangesTimeseries {
        #[command(flatten)]
        common: CommonArgs,

        /// Start of the first period
        #[arg(long, default_value = timeseries::CHANGES_SINCE)]
        since: String,

        /// End of the last period
        #[arg(long, default_value = "now")]
        until: String,

        /// Length of each period, like "30 days" or "2 weeks"
        #[arg(long, default_value = timeseries::CHANGES_PERIOD)]
        period: String,
    },

    /// Who owns the lines that exist at a point in time
    #[command(long_about = "\
Blame every file at the last commit before a date and report how many
surviving lines each author owns, how old they are, and how many of them
are duplicated elsewhere in the tree.

Examples:
  gitwho ownership                            # current head
  gitwho ownership --when \"6 months ago\"
  gitwho ownership --files \"\\.rs$\" --format json")]
    Ownership {
        #[command(flatten)]
        common: CommonArgs,

        /// Point in time to analyze
        #[arg(long, default_value = "now")]
        when: String,

        /// Minimum lines for a duplicated block (default: 4)
        #[arg(long)]
        min_dup_lines: Option<usize>,
    },

    /// Ownership sampled at the end of each period
    OwnershipTimeseries {
        #[command(flatten)]
        common: CommonArgs,

        /// Start of the first period
        #[arg(long, default_value = timeseries::OWNERSHIP_SINCE)]
        since: String,

        /// End of the last period
        #[arg(long, default_value = "now")]
        until: String,

        /// Length of each period
        #[arg(long, default_value = timeseries::OWNERSHIP_PERIOD)]
        period: String,

        /// Minimum lines for a duplicated block (default: 4)
        #[arg(long)]
        min_dup_lines: Option<usize>,
    },

    /// Duplicated blocks of lines at a point in time
    #[command(long_about = "\
List runs of identical lines found in more than one place at the last
commit before a date. Each group prints its first occurrence as
`path:start - end` followed by the places it was copied to.

Examples:
  gitwho duplicates
  gitwho duplicates --min-dup-lines 8 --format full")]
    Duplicates {
        #[command(flatten)]
        common: CommonArgs,

        /// Point in time to analyze
        #[arg(long, default_value = "now")]
        when: String,

        /// Minimum lines for a duplicated block (default: 4)
        #[arg(long)]
        min_dup_lines: Option<usize>,
    },

    /// Print shell completions to stdout
    Completions {
        /// Target shell
        shell: Shell,
    },
}
