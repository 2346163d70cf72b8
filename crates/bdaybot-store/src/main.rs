use bdaybot_store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    pretty_env_logger::init();

    let config = bdaybot_common::config::Config::new()?;

    bdaybot_common::observability::tracing::init_tracer(
        env!("CARGO_PKG_NAME").to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
        &config,
    )?;

    let store = Store::connect(&config).await?;

    let report = store.report().await?;
    log::info!(
        "Store ready: {} users, {} templates, {} notification settings, {} logs, {} system settings",
        report.users,
        report.notification_templates,
        report.notification_settings,
        report.notification_logs,
        report.system_settings,
    );

    let payment = store.system_settings.payment_details().await?;
    if payment.phone.is_none() || payment.name.is_none() {
        log::warn!("Payment details are incomplete: {:?}", payment);
    }

    store.close().await?;

    Ok(())
}
