use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::models::StaffMember;

pub const CREDENTIAL_DELIVERY_ATTEMPTS: u32 = 3;

pub const CREDENTIAL_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Delivers a new staff member's temporary credentials (email, SMS, ...).
#[async_trait]
pub trait CredentialNotifier: Send + Sync {
    async fn send_staff_credentials(
        &self,
        staff: &StaffMember,
        event_title: &str,
        temporary_password: &str,
    ) -> anyhow::Result<()>;
}

/// Development notifier: writes the credentials to the log instead of mailing them.
/// The password itself is only emitted at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl CredentialNotifier for LogNotifier {
    async fn send_staff_credentials(
        &self,
        staff: &StaffMember,
        event_title: &str,
        temporary_password: &str,
    ) -> anyhow::Result<()> {
        info!(
            to = %staff.email,
            event = %event_title,
            access = "/staff/login",
            "Staff credentials issued"
        );
        debug!(
            to = %staff.email,
            temporary_password = %temporary_password,
            "Staff temporary password (development mode)"
        );
        Ok(())
    }
}

/// Tries up to `attempts` times with doubling delay. Returns whether delivery
/// eventually succeeded.
pub async fn deliver_with_retry(
    notifier: &dyn CredentialNotifier,
    staff: &StaffMember,
    event_title: &str,
    temporary_password: &str,
    attempts: u32,
    base_delay: Duration,
) -> bool {
    let mut delay = base_delay;
    for attempt in 1..=attempts {
        match notifier
            .send_staff_credentials(staff, event_title, temporary_password)
            .await
        {
            Ok(()) => return true,
            Err(e) => {
                warn!(
                    staff_id = %staff.id,
                    attempt,
                    error = %e,
                    "Credential delivery failed"
                );
                if attempt < attempts {
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }
    false
}
