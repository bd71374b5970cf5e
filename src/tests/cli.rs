use std::path::PathBuf;

use clap::{CommandFactory, Parser};

use crate::cli::{Cli, Command};

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn resolve_takes_trailing_types() {
    let cli = Cli::try_parse_from(["gma-lua", "resolve", "gma.show.getdmx", "table", "number", "number"])
        .unwrap();
    match cli.command {
        Command::Resolve { path, types } => {
            assert_eq!(path, "gma.show.getdmx");
            assert_eq!(types, ["table", "number", "number"]);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn config_is_global() {
    let cli = Cli::try_parse_from(["gma-lua", "list", "--json", "--config", "/tmp/gma.lua"]).unwrap();
    assert_eq!(cli.config, Some(PathBuf::from("/tmp/gma.lua")));
    assert!(matches!(
        cli.command,
        Command::List {
            namespace: None,
            json: true
        }
    ));
}

#[test]
fn translate_output_flag() {
    let cli = Cli::try_parse_from(["gma-lua", "translate", "in.lua", "-o", "out.lua"]).unwrap();
    match cli.command {
        Command::Translate { file, output } => {
            assert_eq!(file, PathBuf::from("in.lua"));
            assert_eq!(output, Some(PathBuf::from("out.lua")));
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn missing_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["gma-lua"]).is_err());
}
