use crate::constants::DEFAULT_RECENT_DAYS;
use crate::core::LookupError;
use crate::models::{Dependency, Finding};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::fmt;

/// When a finding is worth a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarnPolicy {
    /// Warn about archived repositories and end-of-life runtimes
    pub warn_on_archived: bool,
    /// Recency window in days
    pub recent_days: i64,
}

impl Default for WarnPolicy {
    fn default() -> Self {
        Self {
            warn_on_archived: true,
            recent_days: DEFAULT_RECENT_DAYS,
        }
    }
}

/// Report line category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warn,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
        })
    }
}

/// Outcome of classifying one finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// A lookup failed.
    Error { subject: String, error: LookupError },
    /// Source repository is archived.
    Archived { subject: String },
    /// Runtime cycle has reached end of life.
    EndOfLife { subject: String, date: Option<NaiveDate> },
    /// Runtime cycle reaches (or already reached) end of life within the
    /// recency window.
    EndOfLifeApproaching { subject: String, date: NaiveDate },
    /// No activity within the recency window.
    Stale { subject: String, last_activity: Option<DateTime<Utc>> },
    /// Nothing to report.
    Pass { subject: String },
}

impl Verdict {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Error { .. } => Severity::Error,
            Self::Pass { .. } => Severity::Info,
            _ => Severity::Warn,
        }
    }

    pub fn subject(&self) -> &str {
        match self {
            Self::Error { subject, .. }
            | Self::Archived { subject }
            | Self::EndOfLife { subject, .. }
            | Self::EndOfLifeApproaching { subject, .. }
            | Self::Stale { subject, .. }
            | Self::Pass { subject } => subject,
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass { .. })
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error { subject, error } => write!(f, "{subject} {error}"),
            Self::Archived { subject } => write!(f, "{subject} is archived"),
            Self::EndOfLife { subject, date: Some(date) } => write!(f, "{subject} is EOL ({date})"),
            Self::EndOfLife { subject, date: None } => write!(f, "{subject} is EOL"),
            Self::EndOfLifeApproaching { subject, date } => {
                write!(f, "{subject} end of life approaching ({date})")
            }
            Self::Stale { subject, last_activity: Some(at) } => {
                write!(f, "{subject} last push isn't recent ({})", at.format("%Y-%m-%d"))
            }
            Self::Stale { subject, last_activity: None } => {
                write!(f, "{subject} has no recorded activity")
            }
            Self::Pass { subject } => write!(f, "pass {subject}"),
        }
    }
}

impl WarnPolicy {
    /// Classify `finding` as of `now`.
    pub fn classify(&self, finding: &Finding, now: DateTime<Utc>) -> Verdict {
        let subject = finding.dependency.display_name();
        if let Some(error) = &finding.error {
            return Verdict::Error {
                subject,
                error: error.clone(),
            };
        }

        let window = Duration::days(self.recent_days);
        match &finding.dependency {
            Dependency::Module(module) => {
                if self.warn_on_archived && module.archived {
                    return Verdict::Archived {
                        subject,
                    };
                }
                self.recency(subject, module.last_push, now)
            }
            Dependency::Language(language) => {
                let today = now.date_naive();
                let past_eol = language.eol_date.is_some_and(|date| date <= today);
                if self.warn_on_archived && (language.eol || past_eol) {
                    return Verdict::EndOfLife {
                        subject,
                        date: language.eol_date,
                    };
                }
                // Past dates land here too when archived warnings are off
                match language.eol_date {
                    Some(date) if date <= today + window => {
                        Verdict::EndOfLifeApproaching {
                            subject,
                            date,
                        }
                    }
                    _ => Verdict::Pass {
                        subject,
                    },
                }
            }
            Dependency::Image(image) => self.recency(subject, image.last_update, now),
        }
    }

    fn recency(&self, subject: String, last_activity: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Verdict {
        let window = Duration::days(self.recent_days);
        let is_recent = last_activity.is_some_and(|at| at + window >= now);
        if is_recent {
            Verdict::Pass {
                subject,
            }
        } else {
            Verdict::Stale {
                subject,
                last_activity,
            }
        }
    }
}
