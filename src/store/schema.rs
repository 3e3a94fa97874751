pub const USERS: &str = "users";
pub const BIOMETRIC_DATA: &str = "biometric_data";
pub const DOCUMENTS: &str = "documents";
pub const FRAUD_NOTIFICATIONS: &str = "fraud_notifications";
pub const FEATURE_FLAGS: &str = "feature_flags";
pub const MODEL_METADATA: &str = "model_metadata";
pub const AB_TEST_RESULTS: &str = "ab_test_results";
pub const DEVICE_CONTEXTS: &str = "device_contexts";

/// Collections created at bootstrap, in creation order.
pub const COLLECTIONS: [&str; 8] = [
    USERS,
    BIOMETRIC_DATA,
    DOCUMENTS,
    FRAUD_NOTIFICATIONS,
    FEATURE_FLAGS,
    MODEL_METADATA,
    AB_TEST_RESULTS,
    DEVICE_CONTEXTS,
];

/// Role granted to the application user, scoped to the target database.
pub const APP_USER_ROLE: &str = "readWrite";

/// A single-field ascending index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    pub collection: &'static str,
    pub field: &'static str,
    pub unique: bool,
}

impl IndexSpec {
    const fn asc(collection: &'static str, field: &'static str) -> Self {
        Self {
            collection,
            field,
            unique: false,
        }
    }

    const fn unique(collection: &'static str, field: &'static str) -> Self {
        Self {
            collection,
            field,
            unique: true,
        }
    }

    /// MongoDB's default name for `{ field: 1 }`.
    #[must_use]
    pub fn name(&self) -> String {
        format!("{}_1", self.field)
    }
}

pub const INDEXES: &[IndexSpec] = &[
    // users
    IndexSpec::unique(USERS, "username"),
    IndexSpec::unique(USERS, "email"),
    // biometric_data
    IndexSpec::asc(BIOMETRIC_DATA, "transactionId"),
    IndexSpec::asc(BIOMETRIC_DATA, "userId"),
    IndexSpec::asc(BIOMETRIC_DATA, "status"),
    IndexSpec::asc(BIOMETRIC_DATA, "type"),
    IndexSpec::asc(BIOMETRIC_DATA, "fraudDetected"),
    IndexSpec::asc(BIOMETRIC_DATA, "capturedAt"),
    IndexSpec::asc(BIOMETRIC_DATA, "processedAt"),
    IndexSpec::asc(BIOMETRIC_DATA, "confidenceScore"),
    // documents
    IndexSpec::asc(DOCUMENTS, "transactionId"),
    IndexSpec::asc(DOCUMENTS, "userId"),
    IndexSpec::asc(DOCUMENTS, "status"),
    IndexSpec::asc(DOCUMENTS, "type"),
    IndexSpec::asc(DOCUMENTS, "fraudDetected"),
    IndexSpec::asc(DOCUMENTS, "capturedAt"),
    IndexSpec::asc(DOCUMENTS, "processedAt"),
    // fraud_notifications
    IndexSpec::asc(FRAUD_NOTIFICATIONS, "transactionId"),
    IndexSpec::asc(FRAUD_NOTIFICATIONS, "relatedEntityId"),
    IndexSpec::asc(FRAUD_NOTIFICATIONS, "status"),
    IndexSpec::asc(FRAUD_NOTIFICATIONS, "detectedAt"),
    IndexSpec::asc(FRAUD_NOTIFICATIONS, "notifiedAt"),
    IndexSpec::asc(FRAUD_NOTIFICATIONS, "fraudType"),
    // feature_flags
    IndexSpec::unique(FEATURE_FLAGS, "name"),
    // model_metadata
    IndexSpec::asc(MODEL_METADATA, "modelName"),
    IndexSpec::asc(MODEL_METADATA, "version"),
    IndexSpec::asc(MODEL_METADATA, "activeFrom"),
    // ab_test_results
    IndexSpec::asc(AB_TEST_RESULTS, "testId"),
    IndexSpec::asc(AB_TEST_RESULTS, "transactionId"),
    IndexSpec::asc(AB_TEST_RESULTS, "testGroup"),
];

pub fn indexes_for(collection: &str) -> impl Iterator<Item = &'static IndexSpec> + '_ {
    INDEXES.iter().filter(move |spec| spec.collection == collection)
}
