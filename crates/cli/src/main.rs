use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    orgchart_cli::main_entry().await
}
