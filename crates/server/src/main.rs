#[tokio::main]
async fn main() -> anyhow::Result<()> {
    askboard_server::run().await
}
