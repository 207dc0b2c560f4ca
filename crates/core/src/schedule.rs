//! Timing rules for funnel and scheduled messages.
//!
//! A message has stages; each stage fires `day_offset` days after a base
//! date at a wall-clock `send_time` in Korea Standard Time. The dispatcher
//! ticks periodically and sends every stage whose scheduled instant falls in
//! the window `[scheduled_at, scheduled_at + window)`.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Korea Standard Time offset from UTC, in seconds. KST has no DST.
pub const KST_OFFSET_SECS: i32 = 9 * 3600;

/// Default dispatcher tick, which doubles as the matching window.
pub const DEFAULT_DISPATCH_INTERVAL_SECS: u64 = 300;

/// Maximum number of stages on a single message.
pub const MAX_STAGES: usize = 30;

/// Maximum day offset for a stage (one year).
pub const MAX_DAY_OFFSET: i32 = 365;

/// Maximum stage body length in characters.
pub const MAX_BODY_LENGTH: usize = 2_000;

/// Korea Standard Time.
pub fn kst() -> FixedOffset {
    FixedOffset::east_opt(KST_OFFSET_SECS).expect("KST offset is in range")
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Delivery channel of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageChannel {
    Sms,
    Email,
    Kakao,
}

impl MessageChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sms => "SMS",
            Self::Email => "EMAIL",
            Self::Kakao => "KAKAO",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "SMS" => Ok(Self::Sms),
            "EMAIL" => Ok(Self::Email),
            "KAKAO" => Ok(Self::Kakao),
            other => Err(CoreError::Validation(format!(
                "Unknown message channel: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Time math
// ---------------------------------------------------------------------------

/// Parse a `HH:MM` send time.
pub fn parse_send_time(value: &str) -> Result<NaiveTime, CoreError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| {
        CoreError::Validation(format!("send_time must be HH:MM (got '{value}')"))
    })
}

/// The UTC instant a stage fires for a given base date.
pub fn scheduled_at(base_date: NaiveDate, day_offset: i32, send_time: NaiveTime) -> Timestamp {
    let local = (base_date + Duration::days(i64::from(day_offset))).and_time(send_time);
    kst()
        .from_local_datetime(&local)
        .single()
        .expect("fixed offsets map every local time to exactly one instant")
        .with_timezone(&Utc)
}

/// Whether a stage scheduled at `scheduled_at` falls in the span a tick
/// covers: after the previous tick's `since`, up to and including `now`.
pub fn is_due(scheduled_at: Timestamp, since: Timestamp, now: Timestamp) -> bool {
    since < scheduled_at && scheduled_at <= now
}

/// Calendar date of an instant in KST.
pub fn kst_date(ts: DateTime<Utc>) -> NaiveDate {
    ts.with_timezone(&kst()).date_naive()
}

// ---------------------------------------------------------------------------
// Stage validation
// ---------------------------------------------------------------------------

/// The parts of a stage the timing rules care about.
#[derive(Debug, Clone)]
pub struct StageSpec<'a> {
    pub stage_number: i32,
    pub day_offset: i32,
    pub send_time: &'a str,
    pub body: &'a str,
}

/// Validate a message's stage list.
pub fn validate_stages(stages: &[StageSpec<'_>]) -> Result<(), CoreError> {
    if stages.is_empty() {
        return Err(CoreError::Validation(
            "A message needs at least one stage".to_string(),
        ));
    }
    if stages.len() > MAX_STAGES {
        return Err(CoreError::Validation(format!(
            "A message may have at most {MAX_STAGES} stages (got {})",
            stages.len()
        )));
    }

    let mut seen = std::collections::HashSet::new();
    for stage in stages {
        if stage.stage_number < 1 {
            return Err(CoreError::Validation(format!(
                "stage_number must be at least 1 (got {})",
                stage.stage_number
            )));
        }
        if !seen.insert(stage.stage_number) {
            return Err(CoreError::Validation(format!(
                "Duplicate stage_number {}",
                stage.stage_number
            )));
        }
        if !(0..=MAX_DAY_OFFSET).contains(&stage.day_offset) {
            return Err(CoreError::Validation(format!(
                "day_offset must be between 0 and {MAX_DAY_OFFSET} (got {})",
                stage.day_offset
            )));
        }
        parse_send_time(stage.send_time)?;
        if stage.body.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "Stage {} has an empty body",
                stage.stage_number
            )));
        }
        if stage.body.chars().count() > MAX_BODY_LENGTH {
            return Err(CoreError::Validation(format!(
                "Stage {} body exceeds {MAX_BODY_LENGTH} characters",
                stage.stage_number
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn channel_parse() {
        assert_eq!(MessageChannel::parse("KAKAO").unwrap(), MessageChannel::Kakao);
        assert!(MessageChannel::parse("FAX").is_err());
    }

    #[test]
    fn send_time_parsing() {
        assert_eq!(
            parse_send_time("09:30").unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
        assert!(parse_send_time("25:00").is_err());
        assert!(parse_send_time("9am").is_err());
    }

    #[test]
    fn scheduled_at_converts_kst_to_utc() {
        let t = parse_send_time("09:00").unwrap();
        // 2026-03-03 09:00 KST == 2026-03-03 00:00 UTC
        assert_eq!(scheduled_at(date(2026, 3, 1), 2, t), utc(2026, 3, 3, 0, 0));
    }

    #[test]
    fn early_morning_kst_is_previous_utc_day() {
        let t = parse_send_time("07:00").unwrap();
        assert_eq!(scheduled_at(date(2026, 3, 1), 0, t), utc(2026, 2, 28, 22, 0));
    }

    #[test]
    fn due_span_is_half_open() {
        let at = utc(2026, 3, 3, 0, 0);
        let since = utc(2026, 3, 2, 23, 55);
        assert!(is_due(at, since, at));
        assert!(is_due(at, since, utc(2026, 3, 3, 0, 4)));
        assert!(!is_due(at, since, utc(2026, 3, 2, 23, 59)));
        // The previous tick already covered its own instant.
        assert!(!is_due(at, at, utc(2026, 3, 3, 0, 5)));
    }

    #[test]
    fn late_tick_still_covers_the_gap() {
        let at = utc(2026, 3, 3, 1, 0);
        let first = at - Duration::seconds(1);
        let second = first + Duration::seconds(302);
        assert!(!is_due(at, first - Duration::seconds(300), first));
        assert!(is_due(at, first, second));
    }

    #[test]
    fn kst_date_crosses_midnight() {
        assert_eq!(kst_date(utc(2026, 3, 1, 15, 30)), date(2026, 3, 2));
        assert_eq!(kst_date(utc(2026, 3, 1, 14, 59)), date(2026, 3, 1));
    }

    fn stage(stage_number: i32, day_offset: i32) -> StageSpec<'static> {
        StageSpec {
            stage_number,
            day_offset,
            send_time: "10:00",
            body: "hello",
        }
    }

    #[test]
    fn valid_stages_pass() {
        assert!(validate_stages(&[stage(1, 0), stage(2, 3)]).is_ok());
    }

    #[test]
    fn empty_and_duplicate_stages_fail() {
        assert!(validate_stages(&[]).is_err());
        assert!(validate_stages(&[stage(1, 0), stage(1, 2)]).is_err());
        assert!(validate_stages(&[stage(0, 0)]).is_err());
    }

    #[test]
    fn bad_offset_time_or_body_fail() {
        assert!(validate_stages(&[stage(1, -1)]).is_err());
        assert!(validate_stages(&[stage(1, MAX_DAY_OFFSET + 1)]).is_err());
        let bad_time = StageSpec {
            send_time: "noon",
            ..stage(1, 0)
        };
        assert!(validate_stages(&[bad_time]).is_err());
        let blank = StageSpec {
            body: "   ",
            ..stage(1, 0)
        };
        assert!(validate_stages(&[blank]).is_err());
    }
}
