use crate::config::Config;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, info, warn};

/// Per-channel terminal state. Skipped covers missing configuration or a
/// missing destination; only Sent counts toward dispatch success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOutcome {
    Sent,
    Skipped,
    Failed,
}

const TWILIO_API: &str = "https://api.twilio.com/2010-04-01/Accounts";

async fn send_twilio(
    sid: &str,
    token: &str,
    from: &str,
    to: &str,
    body: &str,
    channel: &str,
) -> ChannelOutcome {
    let url = format!("{TWILIO_API}/{sid}/Messages.json");

    let response = reqwest::Client::new()
        .post(&url)
        .basic_auth(sid, Some(token))
        .form(&[("From", from), ("To", to), ("Body", body)])
        .send()
        .await;

    match response {
        Ok(resp) if resp.status().is_success() => {
            info!(channel, to, "Message sent");
            ChannelOutcome::Sent
        }
        Ok(resp) => {
            error!(channel, to, status = %resp.status(), "Provider rejected message");
            ChannelOutcome::Failed
        }
        Err(e) => {
            error!(channel, to, error = %e, "Send failed");
            ChannelOutcome::Failed
        }
    }
}

pub async fn send_whatsapp(config: &Config, to: Option<&str>, body: &str) -> ChannelOutcome {
    let (Some(sid), Some(token), Some(from)) = (
        config.twilio_account_sid.as_deref(),
        config.twilio_auth_token.as_deref(),
        config.twilio_whatsapp_from.as_deref(),
    ) else {
        warn!("Twilio WhatsApp not configured, skipping");
        return ChannelOutcome::Skipped;
    };
    let Some(to) = to else {
        return ChannelOutcome::Skipped;
    };

    send_twilio(
        sid,
        token,
        &format!("whatsapp:{from}"),
        &format!("whatsapp:{to}"),
        body,
        "whatsapp",
    )
    .await
}

pub async fn send_sms(config: &Config, to: Option<&str>, body: &str) -> ChannelOutcome {
    let (Some(sid), Some(token), Some(from)) = (
        config.twilio_account_sid.as_deref(),
        config.twilio_auth_token.as_deref(),
        config.twilio_sms_from.as_deref(),
    ) else {
        warn!("Twilio SMS not configured, skipping");
        return ChannelOutcome::Skipped;
    };
    let Some(to) = to else {
        return ChannelOutcome::Skipped;
    };

    send_twilio(sid, token, from, to, body, "sms").await
}

pub async fn send_email(
    config: &Config,
    to: Option<&str>,
    subject: &str,
    body: &str,
) -> ChannelOutcome {
    let (Some(host), Some(user), Some(pass)) = (
        config.smtp_host.as_deref(),
        config.email_user.as_deref(),
        config.email_pass.as_deref(),
    ) else {
        warn!("SMTP not configured, skipping email");
        return ChannelOutcome::Skipped;
    };
    let Some(to) = to.filter(|t| !t.trim().is_empty()) else {
        return ChannelOutcome::Skipped;
    };

    let message = match build_message(user, to, subject, body) {
        Ok(m) => m,
        Err(e) => {
            error!(to, error = %e, "Invalid email message");
            return ChannelOutcome::Failed;
        }
    };

    let transport = match AsyncSmtpTransport::<Tokio1Executor>::relay(host) {
        Ok(builder) => builder
            .credentials(Credentials::new(user.to_string(), pass.to_string()))
            .build(),
        Err(e) => {
            error!(error = %e, "Invalid SMTP relay configuration");
            return ChannelOutcome::Failed;
        }
    };

    match transport.send(message).await {
        Ok(_) => {
            info!(to, "Email sent");
            ChannelOutcome::Sent
        }
        Err(e) => {
            error!(to, error = %e, "Email send failed");
            ChannelOutcome::Failed
        }
    }
}

fn build_message(from: &str, to: &str, subject: &str, body: &str) -> anyhow::Result<Message> {
    Ok(Message::builder()
        .from(from.parse()?)
        .to(to.parse()?)
        .subject(subject)
        .body(body.to_string())?)
}
