use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use secrecy::ExposeSecret;
use std::time::Duration;

use campus_core::error::AppError;

use crate::config::SmtpConfig;

/// Outbound delivery of one-time codes. Fire-and-forget from the caller's
/// perspective; delivery failures surface as an error and are not retried
/// here.
#[async_trait]
pub trait OtpMailer: Send + Sync {
    async fn send_otp(&self, to_email: &str, code: &str, ttl_minutes: i64)
        -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct SmtpMailer {
    mailer: SmtpTransport,
    from_email: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, AppError> {
        let creds = Credentials::new(
            config.user.clone(),
            config.password.expose_secret().clone(),
        );

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e.to_string())))?
            .credentials(creds)
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, "Email service initialized");

        Ok(Self {
            mailer,
            from_email: config.user.clone(),
        })
    }

    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        plain_body: &str,
        html_body: &str,
    ) -> Result<(), AppError> {
        let email = Message::builder()
            .from(self.from_email.parse().map_err(
                |e: lettre::address::AddressError| AppError::InternalError(e.into()),
            )?)
            .to(to_email.parse().map_err(
                |e: lettre::address::AddressError| AppError::InternalError(e.into()),
            )?)
            .subject(subject)
            .multipart(
                lettre::message::MultiPart::alternative()
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain_body.to_string()),
                    )
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )
            .map_err(|e| AppError::InternalError(e.into()))?;

        // SmtpTransport is blocking; keep it off the async runtime
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::InternalError(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, subject = %subject, "Email sent successfully");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e.to_string(), to = %to_email, "Failed to send email");
                Err(AppError::EmailError(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl OtpMailer for SmtpMailer {
    async fn send_otp(
        &self,
        to_email: &str,
        code: &str,
        ttl_minutes: i64,
    ) -> Result<(), AppError> {
        let html_body = format!(
            r###"            <html>
                <body style="font-family: Arial, sans-serif;">
                    <h2>Your sign-in code</h2>
                    <p>Use the following code to sign in to the campus portal:</p>
                    <p style="font-size: 28px; letter-spacing: 6px; font-weight: bold;">{}</p>
                    <p style="color: #666; font-size: 12px;">
                        This code expires in {} minutes and can be used once. If you didn't request it, please ignore this email.
                    </p>
                </body>
            </html>
            "###,
            code, ttl_minutes
        );

        let plain_body = format!(
            "Your sign-in code\n\n            Use the following code to sign in to the campus portal:\n\n            {}

            This code expires in {} minutes and can be used once. If you didn't request it, please ignore this email.",
            code, ttl_minutes
        );

        self.send_email(to_email, "Your sign-in code", &plain_body, &html_body)
            .await
    }
}

/// Records sent codes instead of delivering them.
#[derive(Default)]
pub struct MockMailer {
    pub sent: std::sync::Mutex<Vec<(String, String)>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent code sent to `email`, if any.
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .expect("sent mutex poisoned")
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }
}

#[async_trait]
impl OtpMailer for MockMailer {
    async fn send_otp(
        &self,
        to_email: &str,
        code: &str,
        _ttl_minutes: i64,
    ) -> Result<(), AppError> {
        self.sent
            .lock()
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Mock mailer mutex poisoned: {}", e)))?
            .push((to_email.to_string(), code.to_string()));
        Ok(())
    }
}
