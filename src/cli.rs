use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Typed tooling for GrandMA2 console Lua scripts.
#[derive(Parser, Debug)]
#[command(name = "gma-lua", version, about)]
pub struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/gma-lua/config.lua)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the functions of a namespace, or of every namespace
    List {
        /// Dotted namespace path, e.g. gma.show.getobj
        namespace: Option<String>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show which overload a call with the given argument types dispatches to
    Resolve {
        /// Dotted function path, e.g. gma.show.getdmx
        path: String,
        /// Argument type names, e.g. table number number
        types: Vec<String>,
    },

    /// Write EmmyLua annotation stubs for the whole API
    Stubs {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rewrite operator-marker calls into infix expressions
    Translate {
        /// Lua source file
        file: PathBuf,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check call sites from a JSON manifest against the calling conventions
    Check {
        /// Call-site manifest: {"calls": [{"path", "args", "usage", "line"}]}
        manifest: PathBuf,
        /// Print diagnostics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Translate a script and run it against placeholder host functions
    Probe {
        /// Lua source file
        file: PathBuf,
        /// Print the call log as JSON
        #[arg(long)]
        json: bool,
    },
}
