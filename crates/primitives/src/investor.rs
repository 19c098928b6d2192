use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{Id, InvalidId};

#[derive(Eq, Copy, Hash, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvestorId(Id);

impl InvestorId {
    #[must_use]
    pub fn random() -> Self {
        Self(Id::random())
    }
}

impl Deref for InvestorId {
    type Target = Id;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for InvestorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for InvestorId {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

#[derive(Eq, Copy, Hash, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileId(Id);

impl FileId {
    #[must_use]
    pub fn random() -> Self {
        Self(Id::random())
    }
}

impl Deref for FileId {
    type Target = Id;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for FileId {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// A submitted investor record.
///
/// All string fields hold their normalized stored form: the phone number is
/// exactly ten ASCII digits and the state code is upper-cased.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Investor {
    pub id: InvestorId,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub phone_number: String,
    pub street_address: String,
    pub state: String,
    pub zip_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One uploaded document, owned by exactly one investor.
///
/// Created only inside the owning investor's creation transaction and
/// removed only as a cascade of the parent's deletion.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestorFile {
    pub id: FileId,
    pub investor_id: InvestorId,
    pub stored_path: String,
    pub original_name: String,
    pub byte_size: u64,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
}
