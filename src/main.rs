#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    crmdesk_lib::run()
        .await
        .map_err(|e| anyhow::anyhow!("crmdesk failed: {e}"))?;

    Ok(())
}
