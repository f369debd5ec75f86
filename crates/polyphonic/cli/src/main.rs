use colored::Colorize;

#[tokio::main]
async fn main() {
    if let Err(err) = polyphonic_cli::run().await {
        eprintln!("{} {}", "error:".red().bold(), err);
        std::process::exit(1);
    }
}
