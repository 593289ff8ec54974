#[tokio::main]
async fn main() -> std::io::Result<()> {
    trash_match_server::run_with_config().await
}
