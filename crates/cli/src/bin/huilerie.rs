use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    huilerie_cli::main_entry().await
}
