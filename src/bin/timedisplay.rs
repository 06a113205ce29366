//! Pretty printing of elapsed wall-clock time.

use time::Duration;

pub fn pretty_print_duration(duration: Duration) -> String {
    let hours = duration.num_hours();
    let minutes = duration.num_minutes() - 60 * hours;
    let seconds = duration.num_seconds() - 60 * duration.num_minutes();

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats() {
        assert_eq!(pretty_print_duration(Duration::seconds(12)), "12s");
        assert_eq!(pretty_print_duration(Duration::seconds(61)), "1m 1s");
        assert_eq!(pretty_print_duration(Duration::seconds(3671)), "1h 1m 11s");
        assert_eq!(pretty_print_duration(Duration::seconds(0)), "0s");
    }
}
