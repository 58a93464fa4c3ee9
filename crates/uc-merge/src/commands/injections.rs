use camino::Utf8PathBuf;
use colored::Colorize;
use miette::Result;
use ucm_merge::MergeBuilder;

use crate::errors::CliError;
use crate::println_pad;
use crate::utils::{load_settings, select_one};

#[derive(Debug)]
pub struct InjectionsArgs {
    pub config: Utf8PathBuf,
    pub defaults: Option<Utf8PathBuf>,
    pub profile: Option<String>,
}

/// List every class targeted by a mod-layer operator and the units that target it.
pub fn list_injections(args: InjectionsArgs) -> Result<()> {
    let settings = load_settings(&args.config, args.defaults.as_deref())?;
    let (name, profile) = select_one(&settings, args.profile.as_deref())?;

    let outcome = MergeBuilder::from_profile(profile)
        .build()
        .map_err(CliError::from)?;
    let injections = outcome.index.injections();

    println!(
        "{} {}",
        "💉 Injection targets".bright_blue().bold(),
        format!("(profile {name}, {} targets)", injections.len()).dimmed()
    );

    for (target, units) in injections {
        println_pad!("{}", target.bright_cyan().bold());
        for unit in units {
            let operator = unit
                .declared_operator()
                .map(|op| op.as_str())
                .unwrap_or_default();
            println_pad!(
                "   {} {} {} {}",
                "•".bright_cyan(),
                unit.qualified_id(),
                operator.yellow(),
                format!("from {}", unit.layer).dimmed()
            );
        }
    }

    Ok(())
}
