/*
 * Copyright (c) 2024 The NAMIB Project Developers.
 * Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
 * https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
 * <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
 * option. This file may not be copied, modified, or distributed
 * except according to those terms.
 *
 * SPDX-License-Identifier: MIT OR Apache-2.0
 */

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::common::cbor::CborValue;
use crate::common::constants::tags;
use crate::common::tags::Tagged;
use crate::error::{CodecError, DateError};

/// Tag 0: a date/time string as specified in
/// [RFC 8949, section 3.4.1](https://www.rfc-editor.org/rfc/rfc8949.html#section-3.4.1).
///
/// The payload is kept exactly as decoded and only interpreted by [`to_offset_date_time`] and
/// [`to_iso_string`], which is where invalid payloads are reported. When encoded, the payload is
/// normalized to second precision in UTC with a literal `Z` suffix.
///
/// Numeric payloads are interpreted as milliseconds since the Unix epoch.
///
/// [`to_offset_date_time`]: DateTimeTag::to_offset_date_time
/// [`to_iso_string`]: DateTimeTag::to_iso_string
///
/// # Example
/// ```
/// # use cosekit::common::tags::DateTimeTag;
/// let tag = DateTimeTag::parse("2024-03-20T17:30:00.123+02:00")?;
/// assert_eq!(tag.to_iso_string()?, "2024-03-20T15:30:00Z");
/// # Ok::<(), cosekit::error::DateError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DateTimeTag {
    payload: Box<CborValue>,
}

impl DateTimeTag {
    /// Creates a new tag from the given RFC 3339 string, rejecting invalid strings right away.
    ///
    /// # Errors
    /// If `datetime` is not a valid RFC 3339 date/time.
    pub fn parse(datetime: &str) -> Result<DateTimeTag, DateError> {
        parse_date_time(datetime)?;
        Ok(DateTimeTag {
            payload: Box::new(CborValue::Text(datetime.to_string())),
        })
    }

    /// Creates a new tag representing the given `datetime`.
    ///
    /// # Errors
    /// If `datetime` can't be formatted (i.e. its year has more than four digits).
    pub fn from_offset_date_time(datetime: OffsetDateTime) -> Result<DateTimeTag, DateError> {
        Ok(DateTimeTag {
            payload: Box::new(CborValue::Text(format_date_time(datetime)?)),
        })
    }

    /// Wraps the given payload without interpreting it.
    #[must_use]
    pub fn from_payload(payload: CborValue) -> DateTimeTag {
        DateTimeTag {
            payload: Box::new(payload),
        }
    }

    /// Returns the payload as given or decoded.
    #[must_use]
    pub fn payload(&self) -> &CborValue {
        &self.payload
    }

    /// Interprets the payload as a date/time.
    ///
    /// # Errors
    /// - If the payload is a string that is not valid RFC 3339 (this includes the empty string).
    /// - If the payload is a number out of range.
    /// - If the payload is neither a string nor a number.
    pub fn to_offset_date_time(&self) -> Result<OffsetDateTime, DateError> {
        match self.payload.as_ref() {
            CborValue::Text(s) => parse_date_time(s),
            other => epoch_millis(other),
        }
    }

    /// Returns the normalized string representation, e.g. `2024-03-20T15:30:00Z`.
    ///
    /// # Errors
    /// Same as [`DateTimeTag::to_offset_date_time`].
    pub fn to_iso_string(&self) -> Result<String, DateError> {
        format_date_time(self.to_offset_date_time()?)
    }
}

impl TryFrom<OffsetDateTime> for DateTimeTag {
    type Error = DateError;

    fn try_from(value: OffsetDateTime) -> Result<Self, Self::Error> {
        DateTimeTag::from_offset_date_time(value)
    }
}

/// Tag 1004: a full-date string (`YYYY-MM-DD`) as specified in
/// [RFC 8943](https://www.rfc-editor.org/rfc/rfc8943.html).
///
/// Like [`DateTimeTag`], the payload is only interpreted by the accessors, and numeric payloads
/// are treated as milliseconds since the Unix epoch (truncated to the UTC date).
#[derive(Debug, Clone, PartialEq)]
pub struct FullDateTag {
    payload: Box<CborValue>,
}

impl FullDateTag {
    /// Creates a new tag from the given `YYYY-MM-DD` string, rejecting invalid strings right away.
    ///
    /// # Errors
    /// If `date` is not a valid full-date.
    pub fn parse(date: &str) -> Result<FullDateTag, DateError> {
        parse_full_date(date)?;
        Ok(FullDateTag {
            payload: Box::new(CborValue::Text(date.to_string())),
        })
    }

    /// Creates a new tag representing the given `date`.
    ///
    /// # Errors
    /// If `date` can't be formatted.
    pub fn from_date(date: Date) -> Result<FullDateTag, DateError> {
        Ok(FullDateTag {
            payload: Box::new(CborValue::Text(format_full_date(date)?)),
        })
    }

    /// Wraps the given payload without interpreting it.
    #[must_use]
    pub fn from_payload(payload: CborValue) -> FullDateTag {
        FullDateTag {
            payload: Box::new(payload),
        }
    }

    /// Returns the payload as given or decoded.
    #[must_use]
    pub fn payload(&self) -> &CborValue {
        &self.payload
    }

    /// Interprets the payload as a date.
    ///
    /// # Errors
    /// If the payload is neither a valid full-date string nor a number in range.
    pub fn to_date(&self) -> Result<Date, DateError> {
        match self.payload.as_ref() {
            CborValue::Text(s) => parse_full_date(s),
            other => epoch_millis(other).map(OffsetDateTime::date),
        }
    }

    /// Returns the normalized string representation, e.g. `2024-03-20`.
    ///
    /// # Errors
    /// Same as [`FullDateTag::to_date`].
    pub fn to_iso_string(&self) -> Result<String, DateError> {
        format_full_date(self.to_date()?)
    }
}

impl TryFrom<Date> for FullDateTag {
    type Error = DateError;

    fn try_from(value: Date) -> Result<Self, Self::Error> {
        FullDateTag::from_date(value)
    }
}

fn parse_date_time(input: &str) -> Result<OffsetDateTime, DateError> {
    OffsetDateTime::parse(input, &Rfc3339).map_err(|e| DateError::Parse {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

fn parse_full_date(input: &str) -> Result<Date, DateError> {
    Date::parse(input, format_description!("[year]-[month]-[day]")).map_err(|e| {
        DateError::Parse {
            input: input.to_string(),
            reason: e.to_string(),
        }
    })
}

fn format_date_time(datetime: OffsetDateTime) -> Result<String, DateError> {
    datetime
        .to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second]Z"
        ))
        .map_err(|e| DateError::Format(e.to_string()))
}

fn format_full_date(date: Date) -> Result<String, DateError> {
    date.format(format_description!("[year]-[month]-[day]"))
        .map_err(|e| DateError::Format(e.to_string()))
}

fn epoch_millis(payload: &CborValue) -> Result<OffsetDateTime, DateError> {
    let millis = match payload {
        CborValue::Integer(i) => *i,
        CborValue::Float(f) if f.is_finite() => {
            // Saturating cast, anything beyond i128 is out of range anyway.
            #[allow(clippy::cast_possible_truncation)]
            let truncated = f.trunc() as i128;
            truncated
        }
        CborValue::Float(f) => return Err(DateError::OutOfRange(f.to_string())),
        other => return Err(DateError::InvalidPayload(other.kind())),
    };
    millis
        .checked_mul(1_000_000)
        .ok_or_else(|| DateError::OutOfRange(millis.to_string()))
        .and_then(|nanos| {
            OffsetDateTime::from_unix_timestamp_nanos(nanos)
                .map_err(|_| DateError::OutOfRange(millis.to_string()))
        })
}

pub(super) fn encode_date_time(tagged: &Tagged) -> Result<CborValue, CodecError> {
    let normalized = match tagged {
        Tagged::DateTime(d) => d.to_iso_string(),
        other => DateTimeTag::from_payload(other.payload().clone()).to_iso_string(),
    };
    normalized
        .map(CborValue::Text)
        .map_err(|e| CodecError::InvalidTagPayload {
            tag: tags::DATE_TIME,
            reason: e.to_string(),
        })
}

pub(super) fn decode_date_time(payload: CborValue) -> Tagged {
    Tagged::DateTime(DateTimeTag::from_payload(payload))
}

pub(super) fn encode_full_date(tagged: &Tagged) -> Result<CborValue, CodecError> {
    let normalized = match tagged {
        Tagged::FullDate(d) => d.to_iso_string(),
        other => FullDateTag::from_payload(other.payload().clone()).to_iso_string(),
    };
    normalized
        .map(CborValue::Text)
        .map_err(|e| CodecError::InvalidTagPayload {
            tag: tags::FULL_DATE,
            reason: e.to_string(),
        })
}

pub(super) fn decode_full_date(payload: CborValue) -> Tagged {
    Tagged::FullDate(FullDateTag::from_payload(payload))
}
