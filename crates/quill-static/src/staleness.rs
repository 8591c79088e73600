//! Rebuild decisions based on modification times.

use std::time::SystemTime;

/// Decide whether an output artifact must be (re)written.
///
/// `output` is the modification time of the existing artifact, or `None`
/// when there is none yet. Without `force`, a rebuild happens only when the
/// source is strictly newer than the output.
pub fn needs_rebuild(source: SystemTime, output: Option<SystemTime>, force: bool) -> bool {
    if force {
        return true;
    }

    match output {
        None => true,
        Some(output) => source > output,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn missing_output_always_rebuilds() {
        assert!(needs_rebuild(at(10), None, false));
    }

    #[test]
    fn fresh_output_is_skipped_unless_forced() {
        assert!(!needs_rebuild(at(10), Some(at(20)), false));
        assert!(needs_rebuild(at(10), Some(at(20)), true));
    }

    #[test]
    fn equal_timestamps_are_not_stale() {
        assert!(!needs_rebuild(at(10), Some(at(10)), false));
    }

    #[test]
    fn newer_source_rebuilds() {
        assert!(needs_rebuild(at(30), Some(at(20)), false));
    }
}
