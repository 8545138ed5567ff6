//! services/client/src/adapters/email.rs
//!
//! This module contains the adapter for the email delivery provider.
//! It implements the `EmailDeliveryService` port from the `core` crate over
//! async SMTP.

use crate::config::Config;
use crate::error::AppError;
use async_trait::async_trait;
use guestgo_core::domain::CodeEmail;
use guestgo_core::ports::{EmailDeliveryService, PortError, PortResult};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that delivers verification code emails over SMTP.
pub struct SmtpEmailAdapter {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailAdapter {
    /// Creates a new `SmtpEmailAdapter` from the SMTP settings in `Config`.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.clone(),
        );
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| AppError::Internal(format!("SMTP relay setup failed: {}", e)))?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();
        let from = config
            .smtp_from
            .parse::<Mailbox>()
            .map_err(|e| AppError::Internal(format!("Invalid SMTP_FROM address: {}", e)))?;
        Ok(Self { transport, from })
    }
}

//=========================================================================================
// `EmailDeliveryService` Trait Implementation
//=========================================================================================

#[async_trait]
impl EmailDeliveryService for SmtpEmailAdapter {
    async fn send_code(&self, to_address: &str, email: &CodeEmail) -> PortResult<()> {
        let to = to_address
            .parse::<Mailbox>()
            .map_err(|e| PortError::Unexpected(format!("unsendable address: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject("Your GuestGo verification code")
            .body(format!(
                "Your GuestGo verification code is {}.\n\n\
                 It expires in {} minutes. If you did not request it, you can\n\
                 ignore this email.\n",
                email.code, email.valid_minutes
            ))
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| PortError::Provider(e.to_string()))?;
        Ok(())
    }
}
