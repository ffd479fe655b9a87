use time::{format_description::well_known::Rfc3339, OffsetDateTime, PrimitiveDateTime};

pub fn primitive_now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

pub fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

/// Whole-second difference `later - earlier`, negative when `later` is in
/// the past relative to `earlier`.
pub fn seconds_between(earlier: PrimitiveDateTime, later: PrimitiveDateTime) -> i64 {
    later.assume_utc().unix_timestamp() - earlier.assume_utc().unix_timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Time};

    fn at(hour: u8, minute: u8) -> PrimitiveDateTime {
        let date = Date::from_calendar_date(2025, time::Month::January, 2).unwrap();
        PrimitiveDateTime::new(date, Time::from_hms(hour, minute, 0).unwrap())
    }

    #[test]
    fn format_primitive_outputs_utc_z() {
        let date = Date::from_calendar_date(2025, time::Month::January, 2).unwrap();
        let time = Time::from_hms(10, 20, 30).unwrap();
        let value = PrimitiveDateTime::new(date, time);
        assert_eq!(format_primitive(value), "2025-01-02T10:20:30Z");
    }

    #[test]
    fn seconds_between_is_signed() {
        assert_eq!(seconds_between(at(10, 0), at(10, 5)), 300);
        assert_eq!(seconds_between(at(10, 5), at(10, 0)), -300);
    }
}
