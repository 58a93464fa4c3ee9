use camino::Utf8PathBuf;
use colored::Colorize;
use miette::Result;
use ucm_merge::MergeBuilder;

use crate::errors::CliError;
use crate::println_pad;
use crate::utils::{load_settings, select_one};

#[derive(Debug)]
pub struct SubclassesArgs {
    pub class: String,
    pub config: Utf8PathBuf,
    pub defaults: Option<Utf8PathBuf>,
    pub profile: Option<String>,
}

/// Build the index without writing and list every transitive subclass of a class.
pub fn list_subclasses(args: SubclassesArgs) -> Result<()> {
    let settings = load_settings(&args.config, args.defaults.as_deref())?;
    let (name, profile) = select_one(&settings, args.profile.as_deref())?;

    let outcome = MergeBuilder::from_profile(profile)
        .build()
        .map_err(CliError::from)?;
    let subclasses = outcome.index.get_subclasses(&args.class);

    println!(
        "{} {} {}",
        "🌳 Subclasses of".bright_blue().bold(),
        args.class.bright_cyan().bold(),
        format!("(profile {name})").dimmed()
    );
    if subclasses.is_empty() {
        println_pad!("{}", "none".dimmed());
    }
    for subclass in &subclasses {
        println_pad!("{}", subclass);
    }

    Ok(())
}
