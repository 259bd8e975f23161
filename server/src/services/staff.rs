use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::crypto::{self, SecureRandom, TEMPORARY_PASSWORD_LEN};
use crate::models::staff::normalize_email;
use crate::models::{NewStaffMember, StaffCredential, StaffMember, StaffPatch, StaffSession};
use crate::services::notifier::{
    deliver_with_retry, CredentialNotifier, CREDENTIAL_DELIVERY_ATTEMPTS, CREDENTIAL_RETRY_DELAY,
};
use crate::store::{CatalogStore, StaffStore, StoreError};
use crate::utils::error::AppError;

const BAD_LOGIN: &str = "Invalid email or password";

/// Door staff accounts, each scoped to a single event.
#[derive(Clone)]
pub struct StaffDirectory {
    store: Arc<dyn StaffStore>,
    catalog: Arc<dyn CatalogStore>,
    rng: Arc<dyn SecureRandom>,
    notifier: Arc<dyn CredentialNotifier>,
    clock: Arc<dyn Clock>,
}

impl StaffDirectory {
    pub fn new(
        store: Arc<dyn StaffStore>,
        catalog: Arc<dyn CatalogStore>,
        rng: Arc<dyn SecureRandom>,
        notifier: Arc<dyn CredentialNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            catalog,
            rng,
            notifier,
            clock,
        }
    }

    pub async fn authorize(&self, staff_id: Uuid, event_id: Uuid) -> Result<bool, AppError> {
        Ok(self
            .store
            .get_staff(staff_id)
            .await?
            .map(|staff| staff.may_check_in_for(event_id))
            .unwrap_or(false))
    }

    /// The staff record, provided it exists and is active.
    pub async fn active_member(&self, staff_id: Uuid) -> Result<StaffMember, AppError> {
        match self.store.get_staff(staff_id).await? {
            Some(staff) if staff.is_active => Ok(staff),
            _ => Err(AppError::NotAuthorized(staff_id)),
        }
    }

    /// The temporary password goes to the notifier only; the caller never sees it.
    pub async fn create_staff(
        &self,
        event_id: Uuid,
        draft: NewStaffMember,
    ) -> Result<StaffMember, AppError> {
        if let Some(problem) = draft.problem() {
            return Err(AppError::ValidationError(problem));
        }
        let event = self
            .catalog
            .get_event(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event '{}' was not found", event_id)))?;

        let password = crypto::temporary_password(self.rng.as_ref(), TEMPORARY_PASSWORD_LEN);
        let password_hash = crypto::hash_password(self.rng.as_ref(), &password)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        let credential = StaffCredential { password_hash };
        let staff = StaffMember {
            id: Uuid::new_v4(),
            event_id,
            name: draft.name.trim().to_string(),
            email: normalize_email(&draft.email),
            phone: draft.phone,
            role: draft.role,
            is_active: true,
            created_at: self.clock.now(),
            last_login: None,
        };

        let staff = match self.store.create_staff(staff, credential).await {
            Ok(staff) => staff,
            Err(StoreError::Conflict(_)) => {
                return Err(AppError::Conflict(format!(
                    "A staff member with email '{}' already exists for this event",
                    normalize_email(&draft.email)
                )))
            }
            Err(err) => return Err(err.into()),
        };
        info!(
            staff_id = %staff.id,
            event_id = %event_id,
            role = %staff.role,
            "Staff member created"
        );

        let notifier = Arc::clone(&self.notifier);
        let member = staff.clone();
        let event_title = event.title;
        tokio::spawn(async move {
            let delivered = deliver_with_retry(
                notifier.as_ref(),
                &member,
                &event_title,
                &password,
                CREDENTIAL_DELIVERY_ATTEMPTS,
                CREDENTIAL_RETRY_DELAY,
            )
            .await;
            if !delivered {
                warn!(staff_id = %member.id, "Staff credentials were not delivered");
            }
        });

        Ok(staff)
    }

    pub async fn get_staff(&self, id: Uuid) -> Result<StaffMember, AppError> {
        self.store
            .get_staff(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Staff member '{}' was not found", id)))
    }

    pub async fn list_staff(&self, event_id: Uuid) -> Result<Vec<StaffMember>, AppError> {
        Ok(self.store.list_staff(event_id).await?)
    }

    pub async fn update_staff(&self, id: Uuid, patch: StaffPatch) -> Result<StaffMember, AppError> {
        if let Some(problem) = patch.problem() {
            return Err(AppError::ValidationError(problem));
        }
        match self.store.update_staff(id, patch).await {
            Ok(Some(staff)) => {
                info!(staff_id = %id, is_active = staff.is_active, "Staff member updated");
                Ok(staff)
            }
            Ok(None) => Err(AppError::NotFound(format!(
                "Staff member '{}' was not found",
                id
            ))),
            Err(StoreError::Conflict(reason)) => Err(AppError::Conflict(reason)),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn deactivate(&self, id: Uuid) -> Result<StaffMember, AppError> {
        self.update_staff(
            id,
            StaffPatch {
                is_active: Some(false),
                ..StaffPatch::default()
            },
        )
        .await
    }

    pub async fn login(
        &self,
        event_id: Uuid,
        email: &str,
        password: &str,
    ) -> Result<StaffSession, AppError> {
        let email = normalize_email(email);
        let Some((staff, credential)) = self.store.find_staff_login(event_id, &email).await? else {
            warn!(event_id = %event_id, "Login attempt for unknown staff email");
            return Err(AppError::AuthError(BAD_LOGIN.to_string()));
        };

        if !crypto::verify_password(password, &credential.password_hash) {
            warn!(staff_id = %staff.id, "Staff login with wrong password");
            return Err(AppError::AuthError(BAD_LOGIN.to_string()));
        }
        if !staff.is_active {
            return Err(AppError::AuthError("Staff account is inactive".to_string()));
        }

        let event = self
            .catalog
            .get_event(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event '{}' was not found", event_id)))?;
        self.store.record_login(staff.id, self.clock.now()).await?;
        info!(staff_id = %staff.id, event_id = %event_id, "Staff logged in");

        Ok(StaffSession {
            staff_id: staff.id,
            event_id,
            event_title: event.title,
            staff_name: staff.name,
            role: staff.role,
        })
    }
}
