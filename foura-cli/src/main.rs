//! Entry point for the `foura` binary.
#![forbid(unsafe_code)]

use foura_cli::CliError;

#[expect(
    clippy::print_stderr,
    reason = "fatal errors are reported to the operator on stderr"
)]
fn main() {
    match foura_cli::run() {
        Ok(()) => {}
        Err(CliError::ArgumentParsing(err)) if !err.use_stderr() => err.exit(),
        Err(err) => {
            eprintln!("foura: {}", err.one_line());
            std::process::exit(1);
        }
    }
}
