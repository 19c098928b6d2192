//! Shared validation rule set for investor submissions.
//!
//! Single source of truth for every field constraint. The HTTP layer and the
//! storage schema both mirror the bounds defined here; keeping them in one
//! module is what prevents the layers from drifting apart.

#[cfg(test)]
#[path = "tests/validation.rs"]
mod tests;

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

pub const NAME_MAX_LEN: usize = 100;
pub const STREET_ADDRESS_MAX_LEN: usize = 255;
pub const FILE_NAME_MAX_LEN: usize = 255;
pub const MIME_TYPE_MAX_LEN: usize = 100;
pub const STORED_PATH_MAX_LEN: usize = 500;
pub const PHONE_DIGITS: usize = 10;
pub const MIN_AGE_YEARS: i32 = 18;
pub const MAX_AGE_YEARS: i32 = 120;
pub const ZIP_PREFIX_MIN: u32 = 501;
pub const ZIP_PREFIX_MAX: u32 = 99_950;
pub const DEFAULT_MAX_FILE_SIZE: u64 = 3_145_728;

pub const ALLOWED_MIME_TYPES: [&str; 4] = [
    "application/pdf",
    "image/jpeg",
    "image/jpg",
    "image/png",
];

/// The fifty US states plus DC.
pub const STATE_CODES: [&str; 51] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI",
    "ID", "IL", "IN", "IA", "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN",
    "MS", "MO", "MT", "NE", "NV", "NH", "NJ", "NM", "NY", "NC", "ND", "OH",
    "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT", "VA", "WA",
    "WV", "WI", "WY",
];

#[derive(Eq, Copy, Clone, Debug, PartialEq, Serialize)]
pub enum ErrorCode {
    Required,
    Length,
    Invalid,
    Format,
    Range,
    FilesRequired,
    FileSize,
    FileType,
    FileNameLength,
    FileMimeType,
}

impl ErrorCode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "REQUIRED",
            Self::Length => "LENGTH",
            Self::Invalid => "INVALID",
            Self::Format => "FORMAT",
            Self::Range => "RANGE",
            Self::FilesRequired => "FILES_REQUIRED",
            Self::FileSize => "FILE_SIZE",
            Self::FileType => "FILE_TYPE",
            Self::FileNameLength => "FILE_NAME_LENGTH",
            Self::FileMimeType => "FILE_MIME_TYPE",
        }
    }
}

/// A single field-level validation failure.
#[derive(Clone, Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub code: ErrorCode,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            field: field.to_owned(),
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// The seven scalar submission fields, exactly as received.
#[derive(Clone, Debug, Default)]
pub struct RawSubmission {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub phone_number: String,
    pub street_address: String,
    pub state: String,
    pub zip_code: String,
}

/// A submission that passed every field check.
///
/// Fields pass through verbatim except the phone number (stripped to ten
/// digits) and the state code (upper-cased).
#[derive(Clone, Debug)]
pub struct NormalizedSubmission {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub phone_number: String,
    pub street_address: String,
    pub state: String,
    pub zip_code: String,
}

/// Descriptor for one uploaded file, before its bytes are stored anywhere.
#[derive(Clone, Debug)]
pub struct FileDescriptor {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

/// Validate the scalar fields of a submission.
///
/// Checks run in a fixed order (first name, last name, street address,
/// state, ZIP, date of birth, phone) so error ordering is reproducible. The
/// complete error list is computed; callers choose how much of it to
/// surface. `today` is injected so age checks are deterministic under test.
pub fn validate_fields(
    raw: &RawSubmission,
    today: NaiveDate,
) -> Result<NormalizedSubmission, Vec<FieldError>> {
    let mut errors = Vec::new();

    check_text("firstName", "First name", &raw.first_name, NAME_MAX_LEN, &mut errors);
    check_text("lastName", "Last name", &raw.last_name, NAME_MAX_LEN, &mut errors);
    check_text(
        "streetAddress",
        "Street address",
        &raw.street_address,
        STREET_ADDRESS_MAX_LEN,
        &mut errors,
    );

    let state = check_state(&raw.state, &mut errors);
    check_zip(&raw.zip_code, &mut errors);
    let date_of_birth = check_date_of_birth(&raw.date_of_birth, today, &mut errors);
    let phone_number = check_phone(&raw.phone_number, &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }

    // Each `None` above comes with a pushed error, so with no errors all
    // three values are present.
    let (Some(state), Some(date_of_birth), Some(phone_number)) =
        (state, date_of_birth, phone_number)
    else {
        return Err(vec![FieldError::new(
            "submission",
            ErrorCode::Invalid,
            "Submission could not be normalized",
        )]);
    };

    Ok(NormalizedSubmission {
        first_name: raw.first_name.clone(),
        last_name: raw.last_name.clone(),
        date_of_birth,
        phone_number,
        street_address: raw.street_address.clone(),
        state,
        zip_code: raw.zip_code.clone(),
    })
}

/// Validate a batch of uploaded file descriptors.
///
/// An empty returned list means the batch is accepted. Errors accumulate
/// across all files; each error names the offending file.
#[must_use]
pub fn validate_files(files: &[FileDescriptor], max_size: u64) -> Vec<FieldError> {
    if files.is_empty() {
        return vec![FieldError::new(
            "files",
            ErrorCode::FilesRequired,
            "At least one file is required",
        )];
    }

    let mut errors = Vec::new();

    for file in files {
        if file.size > max_size {
            errors.push(FieldError::new(
                "files",
                ErrorCode::FileSize,
                format!(
                    "File \"{}\" exceeds the maximum size of {max_size} bytes",
                    file.name
                ),
            ));
        }
        if !ALLOWED_MIME_TYPES.contains(&file.mime_type.as_str()) {
            errors.push(FieldError::new(
                "files",
                ErrorCode::FileType,
                format!(
                    "File \"{}\" has unsupported type \"{}\"; allowed types are PDF, JPEG and PNG",
                    file.name, file.mime_type
                ),
            ));
        }
        if file.name.chars().count() > FILE_NAME_MAX_LEN {
            errors.push(FieldError::new(
                "files",
                ErrorCode::FileNameLength,
                format!("File name exceeds {FILE_NAME_MAX_LEN} characters"),
            ));
        }
        if file.mime_type.chars().count() > MIME_TYPE_MAX_LEN {
            errors.push(FieldError::new(
                "files",
                ErrorCode::FileMimeType,
                format!(
                    "File \"{}\" declares a MIME type longer than {MIME_TYPE_MAX_LEN} characters",
                    file.name
                ),
            ));
        }
    }

    errors
}

/// Normalize a phone number to bare digits.
///
/// Strips every non-digit character, then a leading US country code if one
/// is present ("1-951-526-3834" and "(951) 526-3834" both normalize to
/// "9515263834").
#[must_use]
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == PHONE_DIGITS + 1 {
        if let Some(rest) = digits.strip_prefix('1') {
            return rest.to_owned();
        }
    }
    digits
}

/// Anniversary-based age in whole years as of `today`.
#[must_use]
pub fn age_in_years(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    use chrono::Datelike;

    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}

fn check_text(
    field: &str,
    label: &str,
    value: &str,
    max_len: usize,
    errors: &mut Vec<FieldError>,
) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(
            field,
            ErrorCode::Required,
            format!("{label} is required"),
        ));
    } else if value.chars().count() > max_len {
        errors.push(FieldError::new(
            field,
            ErrorCode::Length,
            format!("{label} must be at most {max_len} characters"),
        ));
    }
}

fn check_state(value: &str, errors: &mut Vec<FieldError>) -> Option<String> {
    if value.is_empty() {
        errors.push(FieldError::new(
            "state",
            ErrorCode::Required,
            "State is required",
        ));
        return None;
    }
    if value.chars().count() != 2 {
        errors.push(FieldError::new(
            "state",
            ErrorCode::Length,
            "State must be exactly 2 characters",
        ));
        return None;
    }
    let upper = value.to_ascii_uppercase();
    if !STATE_CODES.contains(&upper.as_str()) {
        errors.push(FieldError::new(
            "state",
            ErrorCode::Invalid,
            "State must be a valid US state or territory code",
        ));
        return None;
    }
    Some(upper)
}

fn check_zip(value: &str, errors: &mut Vec<FieldError>) {
    if value.is_empty() {
        errors.push(FieldError::new(
            "zipCode",
            ErrorCode::Required,
            "ZIP code is required",
        ));
        return;
    }
    if !zip_format_ok(value) {
        errors.push(FieldError::new(
            "zipCode",
            ErrorCode::Format,
            "ZIP code must be 5 digits or 5+4 digits",
        ));
        return;
    }
    // Format check guarantees five leading ASCII digits.
    let prefix: u32 = value[..5].parse().unwrap_or(0);
    if !(ZIP_PREFIX_MIN..=ZIP_PREFIX_MAX).contains(&prefix) {
        errors.push(FieldError::new(
            "zipCode",
            ErrorCode::Range,
            "ZIP code is outside the valid range",
        ));
    }
}

fn zip_format_ok(value: &str) -> bool {
    let bytes = value.as_bytes();
    match bytes.len() {
        5 => bytes.iter().all(u8::is_ascii_digit),
        10 => {
            bytes[..5].iter().all(u8::is_ascii_digit)
                && bytes[5] == b'-'
                && bytes[6..].iter().all(u8::is_ascii_digit)
        }
        _ => false,
    }
}

fn check_date_of_birth(
    value: &str,
    today: NaiveDate,
    errors: &mut Vec<FieldError>,
) -> Option<NaiveDate> {
    if value.is_empty() {
        errors.push(FieldError::new(
            "dateOfBirth",
            ErrorCode::Required,
            "Date of birth is required",
        ));
        return None;
    }
    let Ok(date_of_birth) = NaiveDate::parse_from_str(value, "%Y-%m-%d") else {
        errors.push(FieldError::new(
            "dateOfBirth",
            ErrorCode::Format,
            "Date of birth must be an ISO date (YYYY-MM-DD)",
        ));
        return None;
    };
    let age = age_in_years(date_of_birth, today);
    if !(MIN_AGE_YEARS..=MAX_AGE_YEARS).contains(&age) {
        errors.push(FieldError::new(
            "dateOfBirth",
            ErrorCode::Range,
            format!("Age must be between {MIN_AGE_YEARS} and {MAX_AGE_YEARS}"),
        ));
        return None;
    }
    Some(date_of_birth)
}

fn check_phone(value: &str, errors: &mut Vec<FieldError>) -> Option<String> {
    let digits = normalize_phone(value);
    if digits.is_empty() {
        errors.push(FieldError::new(
            "phoneNumber",
            ErrorCode::Required,
            "Phone number is required",
        ));
        return None;
    }
    if digits.len() != PHONE_DIGITS {
        errors.push(FieldError::new(
            "phoneNumber",
            ErrorCode::Length,
            format!("Phone number must contain exactly {PHONE_DIGITS} digits"),
        ));
        return None;
    }
    Some(digits)
}
