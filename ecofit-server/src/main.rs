#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ecofit_server::start_server().await
}
