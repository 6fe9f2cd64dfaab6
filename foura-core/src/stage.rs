//! Funnel stages assigned to people and companies.
//!
//! The four named stages give the model its name; any other label found in
//! weight configuration or event hints is preserved verbatim as
//! [`Stage::Other`].
//!
//! # Examples
//! ```
//! use foura_core::Stage;
//!
//! assert_eq!(Stage::from_label(" Diagnosis "), Stage::Diagnosis);
//! assert_eq!(Stage::Acceptance.to_string(), "acceptance");
//! assert_eq!(Stage::from_label("nurture").as_str(), "nurture");
//! ```

/// Funnel stage inferred from touchpoint activity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "String", into = "String")
)]
pub enum Stage {
    /// Lowest-commitment stage; the default when nothing else is known.
    #[default]
    Attention,
    /// The prospect is researching their problem.
    Diagnosis,
    /// The prospect is evaluating solutions.
    Solution,
    /// The prospect has signalled acceptance (demo, meeting, purchase).
    Acceptance,
    /// Any other lower-cased label supplied by configuration or hints.
    Other(String),
}

impl Stage {
    /// Parse a stage label, trimming and lower-casing it first.
    ///
    /// An empty label maps to [`Stage::Attention`].
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let normalised = label.trim().to_lowercase();
        match normalised.as_str() {
            "" | "attention" => Self::Attention,
            "diagnosis" => Self::Diagnosis,
            "solution" => Self::Solution,
            "acceptance" => Self::Acceptance,
            _ => Self::Other(normalised),
        }
    }

    /// Parse an optional hint, treating blank values as absent.
    #[must_use]
    pub fn from_hint(hint: Option<&str>) -> Option<Self> {
        hint.filter(|value| !value.trim().is_empty())
            .map(Self::from_label)
    }

    /// Return the lower-case label for the stage.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Attention => "attention",
            Self::Diagnosis => "diagnosis",
            Self::Solution => "solution",
            Self::Acceptance => "acceptance",
            Self::Other(label) => label.as_str(),
        }
    }

    /// Report whether the stage qualifies a person as marketing-qualified.
    #[must_use]
    pub const fn is_mql_stage(&self) -> bool {
        matches!(self, Self::Diagnosis | Self::Solution)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Stage {
    fn from(value: String) -> Self {
        Self::from_label(&value)
    }
}

impl From<Stage> for String {
    fn from(value: Stage) -> Self {
        value.as_str().to_owned()
    }
}
