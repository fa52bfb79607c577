#[tokio::main]
async fn main() {
    if let Err(e) = matibabu::run().await {
        eprintln!("matibabu failed to start: {e}");
        std::process::exit(1);
    }
}
