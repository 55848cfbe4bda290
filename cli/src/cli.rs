use std::str::FromStr;

use anyhow::Context;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "makedep")]
#[command(about = "Generate the dependency rules of a source tree")]
#[command(version)]
pub struct Args {
    /// Top-level descriptor to update
    #[arg(short = 'f', value_name = "file", default_value = "Makefile")]
    pub makefile: String,

    /// Print the relative path from one directory to another and exit
    #[arg(short = 'R', num_args = 2, value_names = ["from", "to"])]
    pub relative: Option<Vec<String>>,

    /// Variable overrides
    #[arg(value_name = "NAME=VALUE")]
    pub assignments: Vec<Assignment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub name: String,
    pub value: String,
}

impl FromStr for Assignment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = s.split_once('=').context("expected NAME=VALUE")?;
        let name = name.trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            anyhow::bail!("invalid variable name {name:?}");
        }
        Ok(Assignment {
            name: name.to_string(),
            value: value.trim_start().to_string(),
        })
    }
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overrides_and_relative_paths() {
        let args = Args::try_parse_from(["makedep", "-f", "Make.top", "CROSSTARGET=x86_64-w64-mingw32"])
            .unwrap();
        assert_eq!(args.makefile, "Make.top");
        assert_eq!(args.relative, None);
        assert_eq!(
            args.assignments,
            [Assignment {
                name: "CROSSTARGET".into(),
                value: "x86_64-w64-mingw32".into(),
            }]
        );

        let args = Args::try_parse_from(["makedep", "-R", "dlls/foo", "include"]).unwrap();
        assert_eq!(args.relative, Some(vec!["dlls/foo".into(), "include".into()]));
        assert_eq!(args.makefile, "Makefile");

        assert!(Args::try_parse_from(["makedep", "not-an-assignment"]).is_err());
    }
}
