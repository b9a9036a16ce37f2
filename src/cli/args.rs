//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::compiler::engine::OutputStyle;
use crate::config::EngineKind;

/// Live stylesheet preview: edit SCSS, see compiled CSS as you type
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (default: stylepad.toml)
    #[arg(short = 'C', long, global = true, default_value = "stylepad.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Watch a stylesheet and recompile on every save
    #[command(visible_alias = "w")]
    Watch {
        /// Stylesheet to edit (created with the seed if missing)
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,

        /// Write compiled output to this file instead of the terminal
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        output: Option<PathBuf>,

        /// Quiet period in milliseconds before compiling
        #[arg(short, long, value_name = "MS")]
        debounce: Option<u64>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Compile a stylesheet once
    #[command(visible_alias = "c")]
    Compile {
        /// Stylesheet to compile
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,

        /// Write output to this file instead of stdout
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        output: Option<PathBuf>,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

/// Shared engine arguments for Watch and Compile commands
#[derive(clap::Args, Debug, Clone)]
pub struct EngineArgs {
    /// Compiler engine (process: external command, css: in-process)
    #[arg(short, long)]
    pub engine: Option<EngineKind>,

    /// Output style passed to the engine
    #[arg(short, long)]
    pub style: Option<OutputStyle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_watch() {
        let cli = Cli::try_parse_from([
            "stylepad", "watch", "main.scss", "-o", "out.css", "--debounce", "50", "--engine", "css",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("stylepad.toml"));
        let Commands::Watch {
            file,
            output,
            debounce,
            engine,
        } = cli.command
        else {
            panic!("expected watch");
        };
        assert_eq!(file, PathBuf::from("main.scss"));
        assert_eq!(output, Some(PathBuf::from("out.css")));
        assert_eq!(debounce, Some(50));
        assert_eq!(engine.engine, Some(EngineKind::Css));
        assert_eq!(engine.style, None);
    }

    #[test]
    fn test_parse_compile_with_globals() {
        let cli = Cli::try_parse_from([
            "stylepad", "-v", "compile", "main.scss", "--style", "compressed", "-C", "alt.toml",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("alt.toml"));
        let Commands::Compile { engine, output, .. } = cli.command else {
            panic!("expected compile");
        };
        assert_eq!(engine.style, Some(OutputStyle::Compressed));
        assert_eq!(output, None);
    }

    #[test]
    fn test_missing_file_rejected() {
        assert!(Cli::try_parse_from(["stylepad", "watch"]).is_err());
    }
}
