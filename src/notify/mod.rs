//! Notification dispatch. Delivery is an external collaborator behind the
//! `Mailer` trait; failures are reported to the caller and never retried.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Mail dispatch failed: {0}")]
    Dispatch(String),
}

pub trait Mailer: Send + Sync {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Development mailer: writes the message to the log instead of an SMTP
/// relay. The rest of the system only sees the `Mailer` trait.
pub struct LogMailer {
    pub from: String,
}

impl Mailer for LogMailer {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        tracing::info!(from = %self.from, to = %to, subject = %subject, "outgoing mail");
        tracing::debug!("mail body:\n{}", body);
        Ok(())
    }
}

pub fn verification_message(name: &str, verify_url: &str) -> (String, String) {
    let subject = "Verify Your Email Address for UniConf".to_string();
    let body = format!(
        "Dear {name},\n\n\
         Thank you for registering with UniConf.\n\
         Please follow the link below to verify your email address and activate your account:\n\n\
         {verify_url}\n\n\
         This link will expire in 30 minutes.\n\n\
         If you did not register for this service, please ignore this email.\n\n\
         The UniConf Team"
    );
    (subject, body)
}

pub fn password_reset_message(name: &str, reset_url: &str) -> (String, String) {
    let subject = "Password Reset Request".to_string();
    let body = format!(
        "Dear {name},\n\n\
         A password reset was requested for your UniConf account.\n\
         Follow the link below to choose a new password:\n\n\
         {reset_url}\n\n\
         This link will expire in 30 minutes. If you did not request a reset,\n\
         you can ignore this email.\n\n\
         The UniConf Team"
    );
    (subject, body)
}

pub fn admin_welcome_message(name: &str, email: &str) -> (String, String) {
    let subject = "Your Admin Account has been Created".to_string();
    let body = format!(
        "Dear {name},\n\n\
         An administrator account has been created for you on UniConf.\n\
         Log in with your email address ({email}) and the password you were given,\n\
         then change it from your profile.\n\n\
         The UniConf Team"
    );
    (subject, body)
}

pub fn rejection_message(
    author_name: &str,
    paper_title: &str,
    conference_title: &str,
) -> (String, String) {
    let subject = format!("Decision on Paper: Regrettably Rejected - {conference_title}");
    let body = format!(
        "Dear {author_name},\n\n\
         The final decision on your paper, \"{paper_title}\", submitted to the\n\
         {conference_title}, has been concluded.\n\n\
         Regrettably, your paper was not accepted for presentation at the conference.\n\
         We thank you for your submission and encourage you to submit to future events.\n\n\
         You may still register to attend the conference as a participant via the public site.\n\n\
         The UniConf Team"
    );
    (subject, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_message_carries_captured_identifiers() {
        let (subject, body) =
            rejection_message("Grace Hopper", "On Compilers", "SysConf 2030");
        assert!(subject.contains("SysConf 2030"));
        assert!(body.contains("Grace Hopper"));
        assert!(body.contains("\"On Compilers\""));
    }

    #[test]
    fn log_mailer_always_delivers() {
        let mailer = LogMailer {
            from: "noreply@uniconf.example".into(),
        };
        assert!(mailer.send("a@b.c", "subject", "body").is_ok());
    }
}
