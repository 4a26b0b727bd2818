//! Email notification for sync outcomes via SMTP.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use payslip_core::constants::NOTIFICATION_FOOTER;
use payslip_core::{Config, MonthFailure, MonthKey, SyncError, SyncReport};

/// What a run amounted to, from the recipient's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Uploaded {
        months: Vec<MonthKey>,
        file_names: Vec<String>,
        partial_failures: Vec<MonthFailure>,
    },
    AlreadyExists {
        /// The single month checked, or `None` for "all months".
        checked: Option<MonthKey>,
    },
    Failed {
        error: String,
        month: Option<MonthKey>,
    },
}

impl Outcome {
    pub fn from_report(report: &SyncReport) -> Self {
        if report.uploaded > 0 {
            return Outcome::Uploaded {
                months: report.uploaded_months.clone(),
                file_names: report
                    .uploaded_months
                    .iter()
                    .map(MonthKey::destination_file_name)
                    .collect(),
                partial_failures: report.failures.clone(),
            };
        }

        if !report.has_failures() {
            return Outcome::AlreadyExists { checked: None };
        }

        let month = match report.failures.as_slice() {
            [only] => Some(only.month),
            _ => None,
        };
        Outcome::Failed {
            error: describe_failures(&report.failures),
            month,
        }
    }

    pub fn from_error(error: &SyncError) -> Self {
        Outcome::Failed {
            error: error.to_string(),
            month: None,
        }
    }
}

fn describe_failures(failures: &[MonthFailure]) -> String {
    failures
        .iter()
        .map(|f| {
            let stage = match f.stage {
                payslip_core::FailureStage::Fetch => "download",
                payslip_core::FailureStage::Write => "upload",
            };
            format!("{}: {} failed: {}", f.month, stage, f.reason)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn month_list(months: &[MonthKey]) -> String {
    months
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Subject and plain-text body for `outcome`, stamped with `now`.
pub fn compose(outcome: &Outcome, now: DateTime<Local>) -> (String, String) {
    let time = now.format("%Y-%m-%d %H:%M:%S");
    match outcome {
        Outcome::Uploaded {
            months,
            file_names,
            partial_failures,
        } => {
            let listed = month_list(months);
            let subject = format!("[SUCCESS] Pay Slip Downloaded - {}", listed);
            let mut body = format!(
                "Pay Slip Automation - Success\n\n\
                 The pay slip for {} has been successfully downloaded and uploaded to Google Drive.\n\n\
                 File: {}\n\
                 Time: {}\n",
                listed,
                file_names.join(", "),
                time
            );
            if !partial_failures.is_empty() {
                body.push_str(&format!(
                    "\nSome months could not be synced:\n{}\n",
                    describe_failures(partial_failures)
                ));
            }
            body.push_str(&format!("\n---\n{}\n", NOTIFICATION_FOOTER));
            (subject, body)
        }
        Outcome::AlreadyExists { checked } => {
            let what = checked
                .map(|m| m.to_string())
                .unwrap_or_else(|| "all months".to_string());
            let subject = format!("[INFO] Pay Slip Already Exists - {}", what);
            let body = format!(
                "Pay Slip Automation - Skip\n\n\
                 The pay slip for {} already exists in Google Drive.\n\n\
                 Time: {}\n\n\
                 No action was taken.\n\n\
                 ---\n{}\n",
                what, time, NOTIFICATION_FOOTER
            );
            (subject, body)
        }
        Outcome::Failed { error, month } => {
            let month_info = month.map(|m| format!(" - {}", m)).unwrap_or_default();
            let subject = format!("[ERROR] Pay Slip Automation Failed{}", month_info);
            let body = format!(
                "Pay Slip Automation - Error\n\n\
                 The automated pay slip download process has failed.\n\n\
                 Error Details:\n{}\n\n\
                 Time: {}\n\n\
                 Please check the logs for more information or run the script manually.\n\n\
                 ---\n{}\n",
                error, time, NOTIFICATION_FOOTER
            );
            (subject, body)
        }
    }
}

/// Delivers outcome notifications. Never fails; returns whether a message went out.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, outcome: &Outcome) -> bool;
}

#[derive(Clone)]
struct SmtpSettings {
    sender: String,
    password: String,
    recipient: String,
    server: String,
    port: u16,
}

/// SMTP notifier. No-op (with a warning) if sender, password or recipient
/// is not configured.
#[derive(Clone)]
pub struct EmailNotifier {
    settings: Option<SmtpSettings>,
}

impl EmailNotifier {
    pub fn from_config(config: &Config) -> Self {
        let settings = match (
            config.email_sender(),
            config.email_password(),
            config.email_recipient(),
        ) {
            (Some(sender), Some(password), Some(recipient)) => Some(SmtpSettings {
                sender: sender.to_string(),
                password: password.to_string(),
                recipient: recipient.to_string(),
                server: config.smtp_server().to_string(),
                port: config.smtp_port(),
            }),
            _ => None,
        };
        Self { settings }
    }

    pub fn is_configured(&self) -> bool {
        self.settings.is_some()
    }

    pub async fn send_test_email(&self) -> bool {
        let body = format!(
            "This is a test email from Pay Slip Automation system.\n\n\
             If you received this, your email configuration is working correctly.\n\n\
             Time: {}\n\n\
             ---\n{}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            NOTIFICATION_FOOTER
        );
        self.send("Test - Pay Slip Automation", &body).await
    }

    async fn send(&self, subject: &str, body: &str) -> bool {
        let Some(settings) = &self.settings else {
            tracing::warn!("Email notification skipped - credentials not configured");
            return false;
        };

        tracing::info!(recipient = %settings.recipient, "Sending email");
        match deliver(settings, subject, body).await {
            Ok(()) => {
                tracing::info!("Email sent successfully");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to send email");
                false
            }
        }
    }
}

async fn deliver(settings: &SmtpSettings, subject: &str, body: &str) -> Result<(), String> {
    let from: Mailbox = settings
        .sender
        .parse()
        .map_err(|e| format!("Invalid EMAIL_SENDER: {}", e))?;
    let to: Mailbox = settings
        .recipient
        .parse()
        .map_err(|e| format!("Invalid EMAIL_RECIPIENT: {}", e))?;

    let email = Message::builder()
        .from(from)
        .to(to)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| e.to_string())?;

    let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.server)
        .map_err(|e| e.to_string())?
        .port(settings.port)
        .credentials(Credentials::new(
            settings.sender.clone(),
            settings.password.clone(),
        ))
        .build();

    mailer.send(email).await.map_err(|e| e.to_string())?;
    Ok(())
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, outcome: &Outcome) -> bool {
        let (subject, body) = compose(outcome, Local::now());
        self.send(&subject, &body).await
    }
}
