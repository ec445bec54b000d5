use std::time::Duration;

/// Compact rendering of elapsed times for log lines.
pub trait DurationFormat {
    fn log_str(&self) -> String;
}

impl DurationFormat for Duration {
    fn log_str(&self) -> String {
        if self.as_secs() > 0 {
            format!("{:.2}s", self.as_secs_f64())
        } else if self.as_millis() > 0 {
            format!("{}ms", self.as_millis())
        } else if self.as_micros() > 0 {
            format!("{}\u{b5}s", self.as_micros())
        } else {
            format!("{}ns", self.as_nanos())
        }
    }
}
