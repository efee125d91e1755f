use anyhow::{bail, Context};
use colored::Colorize;
use dreams_diff::{suggest_version, ContentDifference, PatchnoteStyle};
use dreams_index::{build_manifest, ManifestOptions};
use dreams_release::{bundle, compare, read_version, BundleOptions, ToolkitConfig};
use dreams_types::{ChangeKind, PathFilter, VersionIdentifier};
use dreams_upgrade::{apply, upgrade, ApplyWarning, DirectorySource, UpgradeOptions};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Manifest(args) => cmd_manifest(args, &format),
        Command::Diff(args) => cmd_diff(args, &format),
        Command::SuggestVersion(args) => cmd_suggest_version(args),
        Command::Apply(args) => cmd_apply(args, &format),
        Command::Bundle(args) => cmd_bundle(args),
        Command::Upgrade(args) => cmd_upgrade(args, &format),
    }
}

fn manifest_options(no_cache: bool) -> ManifestOptions {
    ManifestOptions {
        filter: PathFilter::everything(),
        use_cache: !no_cache,
    }
}

fn cmd_manifest(args: ManifestArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let manifest = build_manifest(&args.root, &manifest_options(args.no_cache))
        .with_context(|| format!("building manifest of {}", args.root.display()))?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&manifest)?),
        OutputFormat::Text => {
            for (path, fingerprint) in &manifest {
                println!("{}  {}", fingerprint.short().dimmed(), path);
            }
            println!("{} files", manifest.len().to_string().bold());
        }
    }
    Ok(())
}

fn cmd_diff(args: DiffArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let difference = compare(&args.old, &args.new, &manifest_options(args.no_cache))?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&difference)?),
        OutputFormat::Text if difference.is_empty() => println!("No changes."),
        OutputFormat::Text => {
            let style = if args.plain {
                PatchnoteStyle::Plain
            } else {
                PatchnoteStyle::Fancy
            };
            print!("{}", difference.patchnote(style, args.indent));
        }
    }
    Ok(())
}

fn cmd_suggest_version(args: SuggestVersionArgs) -> anyhow::Result<()> {
    let difference = compare(&args.old, &args.new, &ManifestOptions::default())?;
    let label = match args.current.or_else(|| read_version(&args.old)) {
        Some(label) => label,
        None => bail!("{} has no version; pass --current", args.old.display()),
    };
    let current: VersionIdentifier = label.parse()?;
    let next = suggest_version(&current, &difference, &args.prefix)?;
    if next == current {
        println!("{} (unchanged)", next.to_string().bold());
    } else {
        println!("{} -> {}", current, next.to_string().green().bold());
    }
    Ok(())
}

fn cmd_apply(args: ApplyArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let difference = compare(&args.target, &args.source, &ManifestOptions::default())?;
    let rules = ToolkitConfig::load(&args.source)?.ignore_rules();
    let outcome = apply(&difference, &args.source, &args.target, &rules, !args.no_defaults)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome.effective)?),
        OutputFormat::Text => {
            print_summary(&outcome.effective);
            print_warnings(&outcome.warnings);
            for path in &outcome.defaults_installed {
                println!("  {} {}", "default:".cyan(), path);
            }
        }
    }
    Ok(())
}

fn cmd_bundle(args: BundleArgs) -> anyhow::Result<()> {
    let options = BundleOptions {
        increment: args.increment,
        archive: args.archive,
        module_prefix: args.prefix,
    };
    let report = bundle(&args.root, &options)?;
    if report.incremented() {
        println!(
            "Version {} -> {}",
            report.previous_version.dimmed(),
            report.version.green().bold()
        );
    }
    println!(
        "{} Bundled {} files into {}",
        "✓".green().bold(),
        report.files,
        report.output.display().to_string().bold()
    );
    Ok(())
}

fn cmd_upgrade(args: UpgradeArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let repo = match args.repo {
        Some(repo) => repo,
        None => match ToolkitConfig::load(&args.root)?.repository {
            Some(repo) => repo.into(),
            None => bail!("no release repository configured; pass --repo"),
        },
    };
    let source = DirectorySource::new(&repo);
    let options = UpgradeOptions {
        use_remote_config: !args.local_config,
        install_defaults: !args.no_defaults,
        write_patchnote: !args.no_patchnote,
    };
    let report = upgrade(&args.root, &source, &options)
        .with_context(|| format!("upgrading {} from {}", args.root.display(), repo.display()))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report.difference)?),
        OutputFormat::Text => {
            println!(
                "Upgrading {} -> {}",
                report.difference.old_version().dimmed(),
                report.difference.new_version().green().bold()
            );
            print_summary(&report.difference);
            for failure in &report.download_failures {
                println!("  {} {}", "failed:".red(), failure);
            }
            print_warnings(&report.warnings);
            if let Some(path) = &report.patchnote {
                println!("Patchnote written to {}", path.display().to_string().bold());
            }
        }
    }
    if !report.is_clean() {
        eprintln!("{} upgrade finished with warnings", "!".yellow().bold());
    }
    Ok(())
}

fn print_summary(difference: &ContentDifference) {
    if difference.is_empty() {
        println!("Already up to date.");
        return;
    }
    for kind in ChangeKind::ALL {
        let count = difference.paths(kind).len();
        if count == 0 {
            continue;
        }
        let label = match kind {
            ChangeKind::Added => format!("{count} added").green(),
            ChangeKind::Removed => format!("{count} removed").red(),
            ChangeKind::Modified => format!("{count} modified").yellow(),
        };
        println!("  {label}");
    }
}

fn print_warnings(warnings: &[ApplyWarning]) {
    for warning in warnings {
        println!("  {} {}", "warning:".yellow(), warning);
    }
}
