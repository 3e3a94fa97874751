//! Reference documents written on first bootstrap.

use std::collections::BTreeSet;

use bson::doc;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{FeatureFlag, ModelMetadata, PLACEHOLDER_PASSWORD_HASH, Role, UserAccount};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_FULL_NAME: &str = "Admin User";

pub fn feature_flags(now: DateTime<Utc>) -> Result<Vec<FeatureFlag>> {
    Ok(vec![
        FeatureFlag::new(
            "enhanced_face_detection",
            "Enhanced face detection algorithm using deep learning",
            false,
            0,
            now,
        )?,
        FeatureFlag::new(
            "deepfake_detection_v2",
            "New version of deepfake detection algorithm",
            false,
            0,
            now,
        )?,
        FeatureFlag::new(
            "adaptive_device_processing",
            "Detect device capabilities and adapt processing accordingly",
            true,
            100,
            now,
        )?,
    ])
}

/// The administrator account, locked behind the placeholder credential
/// until `admin set-password` runs.
#[must_use]
pub fn admin_account(email: &str, now: DateTime<Utc>) -> UserAccount {
    UserAccount {
        username: ADMIN_USERNAME.to_string(),
        password_hash: PLACEHOLDER_PASSWORD_HASH.to_string(),
        full_name: ADMIN_FULL_NAME.to_string(),
        email: email.to_string(),
        roles: BTreeSet::from([Role::Admin]),
        must_change_password: true,
        created_at: now,
        updated_at: now,
    }
}

pub fn model_metadata(now: DateTime<Utc>) -> Result<Vec<ModelMetadata>> {
    Ok(vec![
        ModelMetadata::new(
            "facenet_face_detection",
            "1.0.0",
            "Initial face detection model",
            0.95,
            doc! {
                "confidenceThreshold": 0.7,
                "minFaceSize": 64,
                "scaleFactor": 1.1,
            },
            now,
        )?,
        ModelMetadata::new(
            "deepfake_detector",
            "1.0.0",
            "Initial deepfake detection model",
            0.92,
            doc! {
                "confidenceThreshold": 0.65,
                "featureExtractorType": "efficientnet",
                "temporalWindowSize": 16,
            },
            now,
        )?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_adaptive_processing_is_enabled() {
        let flags = feature_flags(Utc::now()).unwrap();
        assert_eq!(flags.len(), 3);

        for flag in &flags {
            if flag.name == "adaptive_device_processing" {
                assert!(flag.globally_enabled);
                assert_eq!(flag.rollout_percentage, 100);
            } else {
                assert!(!flag.globally_enabled);
                assert_eq!(flag.rollout_percentage, 0);
            }
        }
    }

    #[test]
    fn test_admin_is_locked_until_credential_issued() {
        let admin = admin_account("ops@example.com", Utc::now());
        assert_eq!(admin.username, "admin");
        assert_eq!(admin.roles, BTreeSet::from([Role::Admin]));
        assert!(admin.must_change_password);
        assert!(admin.credential_pending());
        assert!(!admin.password_hash.starts_with('$'));
    }

    #[test]
    fn test_model_parameters() {
        let models = model_metadata(Utc::now()).unwrap();
        let deepfake = models
            .iter()
            .find(|m| m.model_name == "deepfake_detector")
            .unwrap();
        assert_eq!(deepfake.version, "1.0.0");
        assert_eq!(deepfake.accuracy, 0.92);
        assert_eq!(
            deepfake.parameters.get_i32("temporalWindowSize").unwrap(),
            16
        );
        assert_eq!(
            deepfake.parameters.get_str("featureExtractorType").unwrap(),
            "efficientnet"
        );
    }
}
