use clap::Parser;
use droidctl_cli::Cli;

fn main() {
    let cli = Cli::parse();

    let code = {
        // Streaming shells started with kill-at-exit die with the guard.
        let _cleanup = droidctl_device::cleanup::install();
        match cli.run() {
            Ok(code) => code,
            Err(e) => {
                eprintln!("error: {e}");
                1
            }
        }
    };
    std::process::exit(code);
}
