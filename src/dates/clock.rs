use time::{Date, OffsetDateTime, PrimitiveDateTime};

/// Source of "now" for template rendering and age buckets.
pub trait Clock: Send + Sync {
    fn now(&self) -> PrimitiveDateTime;

    fn today(&self) -> Date {
        self.now().date()
    }
}

/// Wall-clock time in the local offset, falling back to UTC when the offset
/// cannot be determined (e.g. multi-threaded processes on some platforms).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> PrimitiveDateTime {
        let now = match OffsetDateTime::now_local() {
            Ok(now) => now,
            Err(err) => {
                tracing::debug!(?err, "local offset unavailable, using UTC");
                OffsetDateTime::now_utc()
            }
        };
        PrimitiveDateTime::new(now.date(), now.time())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub PrimitiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> PrimitiveDateTime {
        self.0
    }
}
