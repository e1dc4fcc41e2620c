use clap::Parser;
use ncslice::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli::init_logging(&cli);
    cli::run(cli).await
}
