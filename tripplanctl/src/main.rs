use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = tripplanctl::Cli::parse();
    tripplanctl::init_tracing(cli.verbose);
    if let Err(err) = tripplanctl::run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
