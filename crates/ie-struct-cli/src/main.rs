use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use ie_struct::{EffectVersion, GameConfig, StructKind};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "ie-struct", about = "Inspect and convert Infinity Engine effect and variable records")]
struct Cli {
    /// Resolve opcodes for Enhanced Edition builds.
    #[arg(long, global = true, env = "IE_ENHANCED")]
    enhanced: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every field of a resource with its offset and value.
    Dump {
        file: PathBuf,
        /// Record kind; `EFF V2.0` files are detected without it.
        #[arg(long, value_enum)]
        kind: Option<Kind>,
    },
    /// Convert an effect, `EFF` file or effect table to another effect version.
    ///
    /// An `EFF` file converted to extended is written back whole; converted
    /// to compact, the output is the bare 48-byte effect.
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// Target effect version.
        #[arg(long, value_enum)]
        to: Version,
        #[arg(long, value_enum)]
        kind: Option<Kind>,
    },
    /// List the typed values of a variable table.
    Variables { file: PathBuf },
}

/// Record kinds accepted on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Kind {
    Eff,
    Effects,
    Variables,
    Effect,
    EffectV2,
    Variable,
}

impl From<Kind> for StructKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Eff => StructKind::EffFile,
            Kind::Effects => StructKind::EffectTable,
            Kind::Variables => StructKind::VariableTable,
            Kind::Effect => StructKind::EffectV1,
            Kind::EffectV2 => StructKind::EffectV2,
            Kind::Variable => StructKind::Variable,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Version {
    Compact,
    Extended,
}

impl From<Version> for EffectVersion {
    fn from(version: Version) -> Self {
        match version {
            Version::Compact => EffectVersion::Compact,
            Version::Extended => EffectVersion::Extended,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("ie_struct=info".parse()?)
                .add_directive("ie_struct_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = if cli.enhanced {
        GameConfig::enhanced()
    } else {
        GameConfig::classic()
    };

    match cli.command {
        Command::Dump { file, kind } => commands::dump(&file, kind.map(Into::into), &config),
        Command::Convert {
            input,
            output,
            to,
            kind,
        } => commands::convert(&input, &output, kind.map(Into::into), to.into(), &config),
        Command::Variables { file } => commands::variables(&file, &config),
    }
}
