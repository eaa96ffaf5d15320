//! Binary entrypoint for the tasks generator

#[tokio::main]
async fn main() {
    if let Err(e) = tasks_generator::cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
