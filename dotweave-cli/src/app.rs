use std::path::PathBuf;

use clap::Parser;

/// Immutable type names every invocation starts from
pub const DEFAULT_IMMUTABLE_TYPES: &[&str] = &["BsonTimestamp"];

/// dotweave - weave change tracking into a module image, in place
///
/// Options go before the positional arguments: both positionals accept values starting
/// with `-`.
#[derive(Debug, Parser)]
#[command(name = "dotweave", version, about, long_about = None)]
pub struct Cli {
    /// Path to the module image to weave.
    #[arg(value_name = "MODULE", allow_hyphen_values = true)]
    pub module: String,

    /// Types whose full name does not start with this prefix are foreign.
    #[arg(value_name = "PREFIX", allow_hyphen_values = true)]
    pub prefix: Option<String>,

    /// Additional immutable type name (simple name), may be repeated.
    #[arg(long, value_name = "NAME")]
    pub immutable: Vec<String>,

    /// Treat nested types as tracking root candidates.
    #[arg(long)]
    pub nested: bool,

    /// Extra directory searched for referenced modules, may be repeated.
    #[arg(long, value_name = "DIR")]
    pub search_dir: Vec<PathBuf>,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The module path, without the leading `-` of the legacy invocation form
    pub fn module_path(&self) -> PathBuf {
        PathBuf::from(strip_dash(&self.module))
    }

    /// The foreign-type prefix, if one was given
    pub fn foreign_prefix(&self) -> Option<&str> {
        self.prefix.as_deref().map(strip_dash).filter(|p| !p.is_empty())
    }
}

fn strip_dash(value: &str) -> &str {
    value.strip_prefix('-').unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_arguments() {
        let cli = Cli::parse_from(["dotweave", "-Contracts.dwm", "-Contracts."]);
        assert_eq!(cli.module_path(), PathBuf::from("Contracts.dwm"));
        assert_eq!(cli.foreign_prefix(), Some("Contracts."));
    }

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from([
            "dotweave",
            "--immutable",
            "Money",
            "--immutable",
            "Period",
            "--nested",
            "--search-dir",
            "lib",
            "-v",
            "Contracts.dwm",
        ]);
        assert_eq!(cli.module_path(), PathBuf::from("Contracts.dwm"));
        assert_eq!(cli.foreign_prefix(), None);
        assert_eq!(cli.immutable, vec!["Money", "Period"]);
        assert!(cli.nested && cli.verbose);
        assert_eq!(cli.search_dir, vec![PathBuf::from("lib")]);
    }

    #[test]
    fn test_missing_module_is_a_usage_error() {
        assert!(Cli::try_parse_from(["dotweave"]).is_err());
    }
}
