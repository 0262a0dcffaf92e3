use std::fmt;

use log::error;

#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq)]
#[derive(sqlx::Type)]
#[sqlx(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn now() -> Result<Self, ()> {
        use std::time::SystemTime;

        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|duration| duration.as_secs() as i64)
            .map(Self)
            .map_err(|e| {
                error!("couldn't get time: {e:?}");
            })
    }

    pub const fn from_i64(secs: i64) -> Self {
        Self(secs)
    }

    pub fn after_secs(self, secs: u64) -> Self {
        let secs = i64::try_from(secs).unwrap_or(i64::MAX);
        Self(self.0.saturating_add(secs))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ::time::{format_description::well_known::Rfc3339, OffsetDateTime};

        let formatted = OffsetDateTime::from_unix_timestamp(self.0)
            .ok()
            .and_then(|when| when.format(&Rfc3339).ok());

        match formatted {
            Some(s) => write!(fmt, "{}", s),
            None => write!(fmt, "{}", self.0),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn after_saturates() {
        let t = Timestamp::from_i64(i64::MAX - 1);
        assert_eq!(t.after_secs(u64::MAX), Timestamp::from_i64(i64::MAX));
        assert_eq!(Timestamp::from_i64(10).after_secs(5), Timestamp::from_i64(15));
    }

    #[test]
    fn display_rfc3339() {
        assert_eq!(Timestamp::from_i64(0).to_string(), "1970-01-01T00:00:00Z");
    }
}
