use clap::Parser;
use famgoals_client::{Cli, run};

#[tokio::main]
async fn main() -> Result<(), famgoals_client::AgentError> {
    run(Cli::parse()).await
}
