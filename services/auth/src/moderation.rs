//! Influencer approval status updates
//!
//! The new status is committed first; the notification is an explicit step
//! afterwards and its outcome never affects the update.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult, FieldErrors},
    models::ApprovalStatus,
    notifications::{self, Notifier},
    repositories::{AccountStore, StoreError},
    validation,
};

/// Response body for a status update
#[derive(Debug, Serialize, PartialEq)]
pub struct StatusUpdated {
    pub account_id: Uuid,
    pub status: ApprovalStatus,
    pub notified: bool,
}

/// Read the requested status from an update payload
pub fn parse_status(payload: &Map<String, Value>) -> ApiResult<ApprovalStatus> {
    let mut errors = FieldErrors::new();
    let status = validation::read_required_string(payload, "status", &mut errors)
        .and_then(|v| {
            v.parse::<ApprovalStatus>()
                .map_err(|message| errors.add("status", message))
                .ok()
        });

    match status {
        Some(status) if errors.is_empty() => Ok(status),
        _ => Err(ApiError::Validation(errors)),
    }
}

/// Set an influencer's approval status and announce the transition
pub async fn update_status(
    store: &dyn AccountStore,
    notifier: &dyn Notifier,
    from_address: &str,
    account_id: Uuid,
    status: ApprovalStatus,
) -> ApiResult<StatusUpdated> {
    let change = store
        .set_influencer_status(account_id, status)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => ApiError::NotFound("Influencer profile not found".to_string()),
            other => other.into(),
        })?;

    info!(
        "Influencer {} status: {} -> {}",
        account_id, change.previous, change.current
    );

    let notified = notifications::notify_status_change(notifier, from_address, &change).await;

    Ok(StatusUpdated {
        account_id,
        status: change.current,
        notified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::hash_password;
    use crate::models::{NewAccount, NewInfluencerProfile, NewProfile, Role};
    use crate::notifications::{RecordingNotifier, StalledNotifier};
    use crate::repositories::memory::MemoryAccountStore;
    use serde_json::json;
    use std::time::Duration;

    const FROM: &str = "no-reply@hearme.app";

    async fn seed_influencer(store: &MemoryAccountStore) -> Uuid {
        store
            .create_account(
                NewAccount {
                    phone_number: "+15550010".to_string(),
                    username: "creator".to_string(),
                    email: "creator@example.com".to_string(),
                    password_hash: hash_password("password123").unwrap(),
                    role: Role::Influencer,
                },
                NewProfile::Influencer(NewInfluencerProfile::default()),
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_approval_notifies_once() {
        let store = MemoryAccountStore::new();
        let notifier = RecordingNotifier::default();
        let id = seed_influencer(&store).await;

        let updated = update_status(&store, &notifier, FROM, id, ApprovalStatus::Approved)
            .await
            .unwrap();
        assert_eq!(
            updated,
            StatusUpdated {
                account_id: id,
                status: ApprovalStatus::Approved,
                notified: true,
            }
        );
        assert_eq!(notifier.sent.lock().await.len(), 1);

        // Re-approving is a no-op transition
        let again = update_status(&store, &notifier, FROM, id, ApprovalStatus::Approved)
            .await
            .unwrap();
        assert!(!again.notified);
        assert_eq!(notifier.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_delivery_still_commits() {
        let store = MemoryAccountStore::new();
        let notifier = RecordingNotifier {
            fail: true,
            ..Default::default()
        };
        let id = seed_influencer(&store).await;

        let updated = update_status(&store, &notifier, FROM, id, ApprovalStatus::Rejected)
            .await
            .unwrap();
        assert!(!updated.notified);

        let profile = store.find_influencer_profile(id).await.unwrap().unwrap();
        assert_eq!(profile.status, ApprovalStatus::Rejected);
    }

    #[tokio::test]
    async fn test_stalled_notifier_does_not_hold_the_update() {
        let store = MemoryAccountStore::new();
        let notifier = StalledNotifier {
            timeout: Duration::from_millis(50),
        };
        let id = seed_influencer(&store).await;

        let updated = tokio::time::timeout(
            Duration::from_secs(5),
            update_status(&store, &notifier, FROM, id, ApprovalStatus::Approved),
        )
        .await
        .expect("status update should return once delivery is abandoned")
        .unwrap();
        assert!(!updated.notified);

        let profile = store.find_influencer_profile(id).await.unwrap().unwrap();
        assert_eq!(profile.status, ApprovalStatus::Approved);
    }

    #[tokio::test]
    async fn test_back_to_pending_is_silent() {
        let store = MemoryAccountStore::new();
        let notifier = RecordingNotifier::default();
        let id = seed_influencer(&store).await;

        update_status(&store, &notifier, FROM, id, ApprovalStatus::Approved)
            .await
            .unwrap();
        let updated = update_status(&store, &notifier, FROM, id, ApprovalStatus::Pending)
            .await
            .unwrap();
        assert!(!updated.notified);
        assert_eq!(notifier.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_influencer_is_not_found() {
        let store = MemoryAccountStore::new();
        let notifier = RecordingNotifier::default();

        let result =
            update_status(&store, &notifier, FROM, Uuid::new_v4(), ApprovalStatus::Approved).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_parse_status() {
        let payload = |v: Value| match v {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        assert_eq!(
            parse_status(&payload(json!({"status": "approved"}))).unwrap(),
            ApprovalStatus::Approved
        );
        assert!(matches!(
            parse_status(&payload(json!({"status": "archived"}))),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            parse_status(&payload(json!({}))),
            Err(ApiError::Validation(_))
        ));
    }
}
