use super::Registries;
use crate::core::LookupError;
use chrono::NaiveDate;
use serde::Deserialize;

/// End-of-life state of one release cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleStatus {
    /// Flagged end-of-life without a date
    pub eol: bool,
    /// Scheduled (or past) end-of-life date
    pub eol_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct Cycle {
    eol: EolField,
}

/// endoflife.date reports `eol` as either a boolean or a `YYYY-MM-DD` date.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EolField {
    Flag(bool),
    Date(NaiveDate),
}

impl From<EolField> for CycleStatus {
    fn from(field: EolField) -> Self {
        match field {
            EolField::Flag(eol) => Self {
                eol,
                eol_date: None,
            },
            EolField::Date(date) => Self {
                eol: false,
                eol_date: Some(date),
            },
        }
    }
}

impl Registries {
    /// End-of-life state of `product` release `cycle`.
    pub async fn cycle_status(&self, product: &str, cycle: &str) -> Result<CycleStatus, LookupError> {
        let url = format!("{}/{product}/{cycle}.json", self.endpoints.eol.trim_end_matches('/'));
        let cycle: Cycle = self.client.get_json(&url, None).await?;
        Ok(cycle.eol.into())
    }
}
