use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = moneydb::args::parse();
    moneydb::cli::main(args).await
}
