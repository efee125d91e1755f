use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "dreams",
    about = "Dreams: release bundling and incremental upgrades for modpacks",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the content manifest of a tree or release archive
    Manifest(ManifestArgs),
    /// Show the changes between two releases as a patchnote
    Diff(DiffArgs),
    /// Suggest the next version from the changes between two releases
    SuggestVersion(SuggestVersionArgs),
    /// Bring the target tree in line with the source tree
    Apply(ApplyArgs),
    /// Bundle the pack into a release
    Bundle(BundleArgs),
    /// Upgrade an installation to the latest published release
    Upgrade(UpgradeArgs),
}

#[derive(Args, Debug)]
pub struct ManifestArgs {
    pub root: PathBuf,
    /// Hash the tree even when a sidecar is present
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    pub old: PathBuf,
    pub new: PathBuf,
    /// Plain section headers instead of the framed layout
    #[arg(long)]
    pub plain: bool,
    /// Spaces prepended to every line
    #[arg(long, default_value = "0")]
    pub indent: usize,
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Args, Debug)]
pub struct SuggestVersionArgs {
    pub old: PathBuf,
    pub new: PathBuf,
    /// Directory whose added or removed files call for a feature bump
    #[arg(long, default_value = "mods")]
    pub prefix: String,
    /// Current version, when the old release has no descriptor
    #[arg(long)]
    pub current: Option<String>,
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Tree holding the new content
    pub source: PathBuf,
    /// Installation to update in place
    pub target: PathBuf,
    /// Skip installing missing defaults
    #[arg(long)]
    pub no_defaults: bool,
}

#[derive(Args, Debug)]
pub struct BundleArgs {
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
    /// Derive the next version from the previous release
    #[arg(long)]
    pub increment: bool,
    /// Produce a compressed archive instead of a directory
    #[arg(long)]
    pub archive: bool,
    #[arg(long, default_value = "mods")]
    pub prefix: String,
}

#[derive(Args, Debug)]
pub struct UpgradeArgs {
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
    /// Release repository; defaults to the configured one
    #[arg(long)]
    pub repo: Option<PathBuf>,
    #[arg(long)]
    pub no_patchnote: bool,
    #[arg(long)]
    pub no_defaults: bool,
    /// Ignore the configuration published with the release
    #[arg(long)]
    pub local_config: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_diff_options() {
        let cli = Cli::try_parse_from(["dreams", "diff", "a", "b", "--plain", "--indent", "4"]).unwrap();
        match cli.command {
            Command::Diff(args) => {
                assert_eq!(args.old, PathBuf::from("a"));
                assert_eq!(args.new, PathBuf::from("b"));
                assert!(args.plain);
                assert_eq!(args.indent, 4);
                assert!(!args.no_cache);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn bundle_defaults_to_current_directory() {
        let cli = Cli::try_parse_from(["dreams", "bundle", "--increment"]).unwrap();
        match cli.command {
            Command::Bundle(args) => {
                assert_eq!(args.root, PathBuf::from("."));
                assert!(args.increment);
                assert!(!args.archive);
                assert_eq!(args.prefix, "mods");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["dreams", "upgrade", "--repo", "/srv/repo", "-v", "--format", "json"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Command::Upgrade(args) => assert_eq!(args.repo, Some(PathBuf::from("/srv/repo"))),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn suggest_version_is_kebab_case() {
        let cli = Cli::try_parse_from(["dreams", "suggest-version", "old", "new", "--prefix", "plugins"]).unwrap();
        assert!(matches!(cli.command, Command::SuggestVersion(ref a) if a.prefix == "plugins"));
    }

    #[test]
    fn apply_help_describes_direction() {
        use clap::CommandFactory;
        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains("Bring the target tree in line with the source tree"));
    }

    #[test]
    fn missing_arguments_are_rejected() {
        assert!(Cli::try_parse_from(["dreams", "diff", "only-one"]).is_err());
        assert!(Cli::try_parse_from(["dreams", "apply"]).is_err());
    }
}
