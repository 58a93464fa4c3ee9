use camino::Utf8PathBuf;
use clap::builder::{styling::AnsiColor, Styles};
use clap::ColorChoice;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{
    build_profiles, list_injections, list_subclasses, preprocess_file, BuildArgs, InjectionsArgs,
    PreprocessArgs, SubclassesArgs,
};
use miette::Result;

mod commands;
mod errors;
mod utils;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Log every processed file
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge the configured layers and write the result to out_dir
    Build {
        /// The settings file (.json or .toml)
        #[arg(short, long)]
        config: Utf8PathBuf,

        /// A defaults file merged underneath the settings file
        #[arg(long)]
        defaults: Option<Utf8PathBuf>,

        /// Comma-separated profile names, or `all`
        #[arg(short, long, default_value = "all")]
        profile: String,

        /// Merge without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Print a file after preprocessing
    Preprocess {
        /// The script file
        file: Utf8PathBuf,

        /// Define a flag as NAME or NAME=VALUE
        #[arg(short = 'D', long = "define", value_name = "NAME=VALUE")]
        definitions: Vec<String>,
    },
    /// List every transitive subclass of a class
    Subclasses {
        /// The base class name
        class: String,

        /// The settings file (.json or .toml)
        #[arg(short, long)]
        config: Utf8PathBuf,

        /// A defaults file merged underneath the settings file
        #[arg(long)]
        defaults: Option<Utf8PathBuf>,

        /// The profile to build; optional when the settings hold only one
        #[arg(short, long)]
        profile: Option<String>,
    },
    /// List classes targeted by injects/overwrites/merges/shims
    Injections {
        /// The settings file (.json or .toml)
        #[arg(short, long)]
        config: Utf8PathBuf,

        /// A defaults file merged underneath the settings file
        #[arg(long)]
        defaults: Option<Utf8PathBuf>,

        /// The profile to build; optional when the settings hold only one
        #[arg(short, long)]
        profile: Option<String>,
    },
}

fn parse_args() -> Args {
    // Configure colored/styled help output
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Blue.on_default());

    let matches = Args::command()
        .styles(styles)
        .color(ColorChoice::Auto)
        .get_matches();

    Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
}

fn main() -> Result<()> {
    let args = parse_args();
    let log = utils::logging::init_logging(args.verbose);

    match args.command {
        Commands::Build {
            config,
            defaults,
            profile,
            dry_run,
        } => build_profiles(
            BuildArgs {
                config,
                defaults,
                profile,
                dry_run,
            },
            &log,
        ),
        Commands::Preprocess { file, definitions } => {
            preprocess_file(PreprocessArgs { file, definitions })
        }
        Commands::Subclasses {
            class,
            config,
            defaults,
            profile,
        } => list_subclasses(SubclassesArgs {
            class,
            config,
            defaults,
            profile,
        }),
        Commands::Injections {
            config,
            defaults,
            profile,
        } => list_injections(InjectionsArgs {
            config,
            defaults,
            profile,
        }),
    }
}
