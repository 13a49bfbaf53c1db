//! CLI argument parsing.

use clap::Parser;
use std::path::PathBuf;

/// Run bill payment requests from a JSON file
#[derive(Parser, Debug)]
#[command(name = "biller-gateway")]
#[command(about = "Run bill payment requests from a JSON file", long_about = None)]
pub struct CliArgs {
    /// Input file holding one request object or an array of them
    #[arg(value_name = "INPUT", help = "Path to the input JSON file")]
    pub input_file: PathBuf,

    /// Pretty-print the response JSON
    #[arg(long = "pretty", help = "Pretty-print the response JSON")]
    pub pretty: bool,
}

/// Parse command-line arguments, exiting with a usage message on failure.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::plain(&["biller-gateway", "requests.json"], false)]
    #[case::pretty(&["biller-gateway", "--pretty", "requests.json"], true)]
    fn parses_input_and_flags(#[case] args: &[&str], #[case] pretty: bool) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.input_file, PathBuf::from("requests.json"));
        assert_eq!(parsed.pretty, pretty);
    }

    #[test]
    fn input_is_required() {
        assert!(CliArgs::try_parse_from(["biller-gateway"]).is_err());
    }
}
