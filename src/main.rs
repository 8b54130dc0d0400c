use std::process::ExitCode;

mod app;
mod logging;

fn main() -> ExitCode {
    let args = cache_relink::cli::parse();
    app::run(args)
}
