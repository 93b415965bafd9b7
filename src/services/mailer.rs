//! # 메일 전송
//!
//! 집계 패스는 `Mailer` 트레이트만 알고, 실제 전송 방식은 시작 시 결정됩니다.
//! - `SmtpMailer`: `EMAIL_PROVIDER`가 설정된 경우 lettre의 비동기 SMTP 전송
//! - `LogMailer`: 메일 서버가 없을 때 요약을 로그로만 남김

use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;

use crate::config::SmtpConfig;

/// 보낼 메일 한 통
#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid mail address {0}")]
    Address(String),
    #[error("failed to build message: {0}")]
    Build(String),
    #[error("mail transport failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// 465번 포트는 암묵적 TLS, 그 외는 STARTTLS로 접속합니다.
    /// 보내는 사람은 `from`이 있으면 그 주소, 없으면 사용자 이름입니다.
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let sender = config.from.as_deref().unwrap_or(&config.username);
        let from = sender
            .parse::<Mailbox>()
            .map_err(|_| MailError::Address(sender.to_string()))?;

        let builder = if config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| MailError::Transport(e.to_string()))?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        let to = email
            .to
            .parse::<Mailbox>()
            .map_err(|_| MailError::Address(email.to.clone()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        Ok(())
    }
}

/// 시작 시 쓸 메일러를 고릅니다. SMTP 설정이 없거나 쓸 수 없으면 `LogMailer`로 대신합니다.
pub fn mailer_for(smtp: Option<&SmtpConfig>) -> Arc<dyn Mailer> {
    let Some(smtp) = smtp else {
        tracing::warn!("EMAIL_PROVIDER not set, weekly summaries will only be logged");
        return Arc::new(LogMailer);
    };

    match SmtpMailer::new(smtp) {
        Ok(mailer) => {
            tracing::info!(host = %smtp.host, port = smtp.port, "Weekly summaries will be mailed");
            Arc::new(mailer)
        }
        Err(e) => {
            tracing::warn!("Unusable mail settings ({}), weekly summaries will only be logged", e);
            Arc::new(LogMailer)
        }
    }
}

pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "No mail provider configured, summary not sent:\n{}",
            email.body
        );
        Ok(())
    }
}
