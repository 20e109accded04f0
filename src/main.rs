use std::io;
use std::process;
use std::sync::Arc;
use tigerbeagle::args::Args;
use tigerbeagle::client::{LedgerClient, TigerBeetleClient};
use tigerbeagle::engine::Engine;
use tigerbeagle::errors::ArgsError;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = match Args::parse() {
        Ok(args) => args,
        Err(ArgsError::Clap(err)) => err.exit(),
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.settings.log_filter())),
        )
        .with_writer(io::stderr)
        .init();

    let client: Arc<dyn LedgerClient> = match TigerBeetleClient::connect(&args.settings) {
        Ok(client) => Arc::new(client),
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    };

    let mut engine = Engine::new(client.clone(), args.settings.output_dir.clone(), io::stdout());
    let result = engine.run(&args.command, args.settings.record).await;
    client.close();

    if let Err(err) = result {
        eprintln!("{}", err);
        process::exit(1);
    }
}
