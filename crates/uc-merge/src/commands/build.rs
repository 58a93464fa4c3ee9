use camino::Utf8PathBuf;
use colored::Colorize;
use miette::Result;
use ucm_merge::{write_merged, MergeBuilder, MergeOutcome};

use crate::errors::CliError;
use crate::println_pad;
use crate::utils::logging::{enable_verbose, LogHandle};
use crate::utils::{display_path, load_settings};

#[derive(Debug)]
pub struct BuildArgs {
    pub config: Utf8PathBuf,
    pub defaults: Option<Utf8PathBuf>,
    pub profile: String,
    pub dry_run: bool,
}

pub fn build_profiles(args: BuildArgs, log: &LogHandle) -> Result<()> {
    let settings = load_settings(&args.config, args.defaults.as_deref())?;
    let selected = settings.select(&args.profile).map_err(CliError::from)?;

    for (name, profile) in selected {
        if profile.verbose {
            enable_verbose(log);
        }

        println!(
            "{} {}",
            "🔧 Profile:".bright_blue().bold(),
            name.bright_cyan().bold()
        );

        let outcome = MergeBuilder::from_profile(profile)
            .build()
            .map_err(CliError::from)?;
        print_summary(&outcome);

        if args.dry_run {
            println_pad!("{}", "Dry run, nothing written".yellow());
            continue;
        }

        let written = write_merged(&outcome.index, &profile.out_dir)
            .map_err(|e| CliError::write_failed(profile.out_dir.clone(), e))?;
        println_pad!(
            "{} {} files to {}",
            "✅ Wrote".bright_green().bold(),
            written.len(),
            profile.out_dir.as_str().bright_white()
        );
    }

    Ok(())
}

fn print_summary(outcome: &MergeOutcome) {
    for report in &outcome.stats.layers {
        println_pad!(
            "{} {} {} {}",
            "•".bright_cyan(),
            format!("[{}]", report.layer.precedence()).dimmed(),
            report.layer.to_string().bright_cyan().bold(),
            format!(
                "({} scripts, {} assets, {} skipped, {} blacklisted)",
                report.scripts, report.assets, report.skipped, report.blacklisted
            )
            .dimmed()
        );
    }

    for skipped in &outcome.skipped {
        let root = outcome
            .stats
            .layers
            .iter()
            .find(|report| report.layer == skipped.layer)
            .map(|report| report.root.as_path());
        let path = match root {
            Some(root) => display_path(&skipped.path, root),
            None => skipped.path.clone(),
        };
        println_pad!(
            "   {} {} {}",
            "skipped".yellow(),
            path,
            format!("({})", skipped.reason).dimmed()
        );
    }

    let index = &outcome.index;
    println_pad!(
        "{} {} classes, {} assets, {} injection targets, {} skipped in {:.2?}",
        "📊".bright_magenta(),
        index.script_count().to_string().bright_white().bold(),
        index.asset_count().to_string().bright_white().bold(),
        index.injections().len().to_string().bright_white().bold(),
        outcome.skipped.len().to_string().bright_white().bold(),
        outcome.stats.build_time
    );
}
