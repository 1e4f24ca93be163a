use std::process::ExitCode;

fn main() -> ExitCode {
    craftquote_cli::run()
}
