#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    gym_scheduler::run().await
}
