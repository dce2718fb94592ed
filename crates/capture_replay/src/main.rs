mod replay;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "capture-replay")]
#[command(about = "Reconstruct the assistant reply from a captured response body")]
struct Cli {
    #[command(flatten)]
    args: replay::Args,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), replay::Error> {
    init_tracing();
    let cli = Cli::parse();
    match replay::run(cli.args).await? {
        replay::Output::Json(json) => println!("{json}"),
        replay::Output::NotIntercepted { url } => {
            eprintln!("not an intercepted endpoint, nothing to reconstruct: {url}")
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
