use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::env;

use crate::utils::helpers::OTP_EXPIRATION_MINUTES;

/// SMTP settings for outgoing mail
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_email: String,
    pub from_name: String,
}

impl EmailConfig {
    /// Load email configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            smtp_host: env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
            smtp_port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "465".to_string())
                .parse()
                .map_err(|_| "SMTP_PORT must be a valid number")?,
            smtp_username: env::var("SMTP_USERNAME").map_err(|_| "SMTP_USERNAME is required")?,
            smtp_password: env::var("SMTP_PASSWORD").map_err(|_| "SMTP_PASSWORD is required")?,
            from_email: env::var("SMTP_FROM_EMAIL").map_err(|_| "SMTP_FROM_EMAIL is required")?,
            from_name: env::var("SMTP_FROM_NAME").unwrap_or_else(|_| "Chilli".to_string()),
        })
    }
}

/// Outgoing mail over an authenticated SMTPS relay
pub struct EmailService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl EmailService {
    pub fn new() -> Result<Self, String> {
        let config = EmailConfig::from_env()?;

        let sender: Mailbox = format!("{} <{}>", config.from_name, config.from_email)
            .parse()
            .map_err(|e| format!("Invalid from address: {}", e))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| format!("Failed to create SMTP transport: {}", e))?
            .credentials(Credentials::new(config.smtp_username, config.smtp_password))
            .port(config.smtp_port)
            .build();

        Ok(Self { transport, sender })
    }

    pub async fn send_login_otp_email(
        &self,
        to_email: &str,
        name: &str,
        otp_code: &str,
    ) -> Result<(), String> {
        let recipient: Mailbox = to_email
            .parse()
            .map_err(|e| format!("Invalid recipient address: {}", e))?;

        let email = Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .subject("Your Chilli login code")
            .header(ContentType::TEXT_PLAIN)
            .body(otp_email_body(name, otp_code))
            .map_err(|e| format!("Failed to build email: {}", e))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| format!("Failed to send email: {}", e))?;

        Ok(())
    }
}

pub fn otp_email_body(name: &str, otp_code: &str) -> String {
    format!(
        "Hi {},\n\n\
        Your Chilli login code is: {}\n\n\
        This code will expire in {} minutes.\n\n\
        If you didn't request this, please ignore this email.",
        name, otp_code, OTP_EXPIRATION_MINUTES
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_body_mentions_code_and_lifetime() {
        let body = otp_email_body("Ada", "482913");

        assert!(body.starts_with("Hi Ada,"));
        assert!(body.contains("482913"));
        assert!(body.contains("10 minutes"));
    }
}
