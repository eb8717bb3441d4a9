//! Sends a message with an optional attachment using settings from the
//! environment (or a `.env` file).
//!
//! ```text
//! RUST_LOG=graph_sendmail=debug cargo run --example send_mail -- \
//!     alice@contoso.com ./report.pdf
//! ```

use graph_sendmail::{Attachment, BodyType, Config, Importance, Mailer};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let recipient = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: send_mail <recipient> [attachment]"))?;
    let attachment = args.next();

    let config = Config::from_env()?;
    tracing::info!(
        sender = %config.sender_address,
        tenant = %config.credentials.tenant_id,
        "Configuration loaded"
    );

    let mailer = Mailer::new(config)?;

    let mut message = mailer
        .compose(
            "Hello from graph-sendmail",
            "<p>This message was sent through the <b>Microsoft Graph</b> sendMail API.</p>",
        )
        .with_body_type(BodyType::Html)
        .with_importance(Importance::Normal)
        .to(recipient);

    if let Some(path) = attachment {
        message = message.attach(Attachment::from_path(path)?);
    }

    let result = mailer.send(&message).await?;
    tracing::info!(status = result.status_code, "Mail accepted");

    Ok(())
}
