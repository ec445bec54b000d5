#[tokio::main]
async fn main() {
    rego_language_server::run().await;
}
