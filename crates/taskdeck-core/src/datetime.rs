use chrono::{
  DateTime,
  Local,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  SecondsFormat,
  Utc
};
use chrono_tz::Tz;
use tracing::{
  debug,
  warn
};

pub const DATE_FORMAT: &str =
  "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// Where "today" is computed. `None`
/// in the config means the machine's
/// local zone.
#[derive(Debug, Clone, Copy)]
pub enum Zone {
  Local,
  Named(Tz)
}

impl Zone {
  pub fn from_config(
    raw: Option<&str>
  ) -> Self {
    let Some(raw) = raw
      .map(str::trim)
      .filter(|s| !s.is_empty())
    else {
      return Self::Local;
    };

    if raw.eq_ignore_ascii_case("local")
    {
      return Self::Local;
    }

    match raw.parse::<Tz>() {
      | Ok(tz) => {
        debug!(timezone = %tz, "using configured timezone");
        Self::Named(tz)
      }
      | Err(err) => {
        warn!(timezone = %raw, error = %err, "unknown timezone; falling back to local time");
        Self::Local
      }
    }
  }

  pub fn now_local(
    &self,
    now: DateTime<Utc>
  ) -> NaiveDateTime {
    match self {
      | Self::Local => {
        now
          .with_timezone(&Local)
          .naive_local()
      }
      | Self::Named(tz) => {
        now
          .with_timezone(tz)
          .naive_local()
      }
    }
  }

  pub fn today(
    &self,
    now: DateTime<Utc>
  ) -> NaiveDate {
    self.now_local(now).date()
  }
}

fn is_blank_marker(
  raw: &str
) -> bool {
  let trimmed = raw.trim();
  trimmed.is_empty()
    || trimmed == "null"
    || trimmed == "undefined"
}

/// `YYYY-MM-DD`; empty, `null` and
/// `undefined` read as absent.
pub fn parse_date(
  raw: &str
) -> Option<NaiveDate> {
  if is_blank_marker(raw) {
    return None;
  }
  NaiveDate::parse_from_str(
    raw.trim(),
    DATE_FORMAT
  )
  .ok()
}

/// `HH:MM`, tolerating a trailing
/// `:SS`.
pub fn parse_time(
  raw: &str
) -> Option<NaiveTime> {
  if is_blank_marker(raw) {
    return None;
  }
  let trimmed = raw.trim();
  NaiveTime::parse_from_str(
    trimmed,
    TIME_FORMAT
  )
  .or_else(|_| {
    NaiveTime::parse_from_str(
      trimmed, "%H:%M:%S"
    )
  })
  .ok()
}

pub fn parse_timestamp(
  raw: &str
) -> Option<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(
    raw.trim()
  )
  .ok()
  .map(|dt| dt.with_timezone(&Utc))
}

pub fn format_timestamp(
  dt: &DateTime<Utc>
) -> String {
  dt.to_rfc3339_opts(
    SecondsFormat::Millis,
    true
  )
}

pub mod timestamp_serde {
  use chrono::{
    DateTime,
    Utc
  };
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  pub fn serialize<S>(
    dt: &DateTime<Utc>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &super::format_timestamp(dt)
    )
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<DateTime<Utc>, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    super::parse_timestamp(&raw)
      .ok_or_else(|| {
        serde::de::Error::custom(
          format!(
            "invalid timestamp: {raw}"
          )
        )
      })
  }
}

pub mod date_serde {
  use chrono::NaiveDate;
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  pub fn serialize<S>(
    date: &Option<NaiveDate>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    match date {
      | Some(value) => {
        serializer.serialize_str(
          &value
            .format(super::DATE_FORMAT)
            .to_string()
        )
      }
      | None => {
        serializer.serialize_none()
      }
    }
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<Option<NaiveDate>, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = Option::<String>::deserialize(
      deserializer
    )?;
    Ok(
      raw
        .as_deref()
        .and_then(super::parse_date)
    )
  }
}

pub mod time_serde {
  use chrono::NaiveTime;
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  pub fn serialize<S>(
    time: &Option<NaiveTime>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    match time {
      | Some(value) => {
        serializer.serialize_str(
          &value
            .format(super::TIME_FORMAT)
            .to_string()
        )
      }
      | None => {
        serializer.serialize_none()
      }
    }
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<Option<NaiveTime>, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = Option::<String>::deserialize(
      deserializer
    )?;
    Ok(
      raw
        .as_deref()
        .and_then(super::parse_time)
    )
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    NaiveTime,
    TimeZone,
    Utc
  };

  use super::{
    Zone,
    format_timestamp,
    parse_date,
    parse_time,
    parse_timestamp
  };

  #[test]
  fn blank_markers_read_as_absent() {
    for raw in
      ["", "  ", "null", "undefined"]
    {
      assert_eq!(parse_date(raw), None);
      assert_eq!(parse_time(raw), None);
    }
  }

  #[test]
  fn parses_dates_and_times() {
    assert_eq!(
      parse_date("2025-01-10"),
      NaiveDate::from_ymd_opt(
        2025, 1, 10
      )
    );
    assert_eq!(
      parse_date("10/01/2025"),
      None
    );
    assert_eq!(
      parse_time("09:30"),
      NaiveTime::from_hms_opt(9, 30, 0)
    );
    assert_eq!(
      parse_time("23:59:10"),
      NaiveTime::from_hms_opt(
        23, 59, 10
      )
    );
    assert_eq!(parse_time("25:00"), None);
  }

  #[test]
  fn timestamps_use_millisecond_zulu_form()
   {
    let dt = Utc
      .with_ymd_and_hms(
        2025, 1, 10, 8, 5, 0
      )
      .unwrap();
    let text = format_timestamp(&dt);
    assert_eq!(
      text,
      "2025-01-10T08:05:00.000Z"
    );
    assert_eq!(
      parse_timestamp(&text),
      Some(dt)
    );
    assert_eq!(
      parse_timestamp(
        "2025-01-10T09:05:00+01:00"
      ),
      Some(dt)
    );
  }

  #[test]
  fn named_zone_decides_today() {
    let now = Utc
      .with_ymd_and_hms(
        2025, 1, 10, 23, 30, 0
      )
      .unwrap();
    let tokyo = Zone::from_config(
      Some("Asia/Tokyo")
    );
    let la = Zone::from_config(Some(
      "America/Los_Angeles"
    ));
    assert_eq!(
      tokyo.today(now),
      NaiveDate::from_ymd_opt(
        2025, 1, 11
      )
      .unwrap()
    );
    assert_eq!(
      la.today(now),
      NaiveDate::from_ymd_opt(
        2025, 1, 10
      )
      .unwrap()
    );
  }

  #[test]
  fn unknown_zone_falls_back_to_local() {
    assert!(matches!(
      Zone::from_config(Some(
        "Mars/Olympus"
      )),
      Zone::Local
    ));
    assert!(matches!(
      Zone::from_config(None),
      Zone::Local
    ));
  }
}
