use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Primary reason for leaving, as offered on the form. Serialized with the
/// labels the form shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReasonForLeaving {
    #[default]
    #[serde(rename = "New Job Opportunity")]
    NewJobOpportunity,
    #[serde(rename = "Career Growth")]
    CareerGrowth,
    #[serde(rename = "Work-Life Balance")]
    WorkLifeBalance,
    #[serde(rename = "Salary & Benefits")]
    SalaryAndBenefits,
    #[serde(rename = "Work Environment")]
    WorkEnvironment,
    #[serde(rename = "Management Issues")]
    ManagementIssues,
    #[serde(rename = "Personal Reasons")]
    PersonalReasons,
    #[serde(rename = "Other")]
    Other,
}

impl ReasonForLeaving {
    /// Form order. The template's choice slots `p1`..`p8` follow it.
    pub const ALL: [ReasonForLeaving; 8] = [
        ReasonForLeaving::NewJobOpportunity,
        ReasonForLeaving::CareerGrowth,
        ReasonForLeaving::WorkLifeBalance,
        ReasonForLeaving::SalaryAndBenefits,
        ReasonForLeaving::WorkEnvironment,
        ReasonForLeaving::ManagementIssues,
        ReasonForLeaving::PersonalReasons,
        ReasonForLeaving::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ReasonForLeaving::NewJobOpportunity => "New Job Opportunity",
            ReasonForLeaving::CareerGrowth => "Career Growth",
            ReasonForLeaving::WorkLifeBalance => "Work-Life Balance",
            ReasonForLeaving::SalaryAndBenefits => "Salary & Benefits",
            ReasonForLeaving::WorkEnvironment => "Work Environment",
            ReasonForLeaving::ManagementIssues => "Management Issues",
            ReasonForLeaving::PersonalReasons => "Personal Reasons",
            ReasonForLeaving::Other => "Other",
        }
    }
}

impl fmt::Display for ReasonForLeaving {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum YesNo {
    #[default]
    Yes,
    No,
}

impl YesNo {
    pub fn is_yes(self) -> bool {
        self == YesNo::Yes
    }
}

/// A 1–5 rating. Out-of-range values fail deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Rating {
    fn default() -> Self {
        Rating(3)
    }
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rating::new(value).ok_or_else(|| {
            format!(
                "rating must be between {} and {}, got {value}",
                Rating::MIN,
                Rating::MAX
            )
        })
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// One complete exit interview submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExitInterviewAnswers {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub job_title: String,
    /// Defaults to the submission date when omitted.
    #[serde(default)]
    pub last_working_day: Option<NaiveDate>,

    #[serde(default)]
    pub reason_for_leaving: ReasonForLeaving,
    /// Only written to the document when the reason is `Other`.
    #[serde(default)]
    pub other_reason: String,

    #[serde(default)]
    pub enjoyed_most: String,
    #[serde(default)]
    pub challenges: String,
    #[serde(default)]
    pub manager_relationship: Rating,
    #[serde(default)]
    pub training_opportunities: YesNo,

    #[serde(default)]
    pub salary_satisfaction: Rating,
    #[serde(default)]
    pub benefits_satisfaction: Rating,

    #[serde(default)]
    pub recommendations: String,
    #[serde(default)]
    pub recommend_company: YesNo,

    #[serde(default)]
    pub final_comments: String,
}

impl ExitInterviewAnswers {
    /// The free-text reason, blanked unless the reason is `Other`.
    pub fn effective_other_reason(&self) -> &str {
        if self.reason_for_leaving == ReasonForLeaving::Other {
            &self.other_reason
        } else {
            ""
        }
    }
}
