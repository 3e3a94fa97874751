use std::fmt;

use serde::Serialize;

/// Outcome of one provisioning item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provisioned {
    Created,
    Existing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    AppUser,
    Collection,
    Index,
    FeatureFlag,
    AdminAccount,
    ModelMetadata,
}

impl Step {
    pub const ALL: [Step; 6] = [
        Step::AppUser,
        Step::Collection,
        Step::Index,
        Step::FeatureFlag,
        Step::AdminAccount,
        Step::ModelMetadata,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Step::AppUser => "app user",
            Step::Collection => "collections",
            Step::Index => "indexes",
            Step::FeatureFlag => "feature flags",
            Step::AdminAccount => "admin account",
            Step::ModelMetadata => "model metadata",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepItem {
    pub step: Step,
    pub name: String,
    pub outcome: Provisioned,
}

#[derive(Debug, Clone, Serialize)]
pub struct BootstrapReport {
    pub target: String,
    pub items: Vec<StepItem>,
}

impl BootstrapReport {
    #[must_use]
    pub fn new(target: String) -> Self {
        Self {
            target,
            items: Vec::new(),
        }
    }

    pub fn record(&mut self, step: Step, name: impl Into<String>, outcome: Provisioned) {
        self.items.push(StepItem {
            step,
            name: name.into(),
            outcome,
        });
    }

    #[must_use]
    pub fn count(&self, step: Step, outcome: Provisioned) -> usize {
        self.items
            .iter()
            .filter(|item| item.step == step && item.outcome == outcome)
            .count()
    }

    #[must_use]
    pub fn created(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.outcome == Provisioned::Created)
            .count()
    }

    /// True when the admin account was inserted by this run.
    #[must_use]
    pub fn admin_created(&self) -> bool {
        self.count(Step::AdminAccount, Provisioned::Created) > 0
    }
}

impl fmt::Display for BootstrapReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Bootstrap of {}", self.target)?;
        for step in Step::ALL {
            let created = self.count(step, Provisioned::Created);
            let existing = self.count(step, Provisioned::Existing);
            writeln!(
                f,
                "  {:<16} {created} created, {existing} already present",
                step.label()
            )?;
        }
        Ok(())
    }
}
