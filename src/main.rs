#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    tubely::TubelyConfiguration::build_default()?
        .install_tracing()?
        .install_metrics()?
        .run()
        .await
}
