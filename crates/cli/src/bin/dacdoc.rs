use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    dacdoc_cli::main_entry().await
}
