#[tokio::main]
async fn main() -> std::io::Result<()> {
    survival_server::frameworks::server::run_with_config().await
}
