//! Progress reporting side channel.
//!
//! Reports are synchronous and made on the pipeline thread, so observers must
//! return quickly. Nothing in the pipeline depends on them.

/// Receives `(percent, message)` pairs as a job advances.
pub trait Progress {
    fn report(&self, percent: u8, message: &str);
}

/// Discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn report(&self, _percent: u8, _message: &str) {}
}

/// Forwards reports to the `log` facade at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl Progress for LogProgress {
    fn report(&self, percent: u8, message: &str) {
        log::info!("[{percent:>3}%] {message}");
    }
}

impl<F> Progress for F
where
    F: Fn(u8, &str),
{
    fn report(&self, percent: u8, message: &str) {
        self(percent, message)
    }
}

/// Map step `i` of `total` onto the `[start, start + span)` percent range.
pub(crate) fn scaled(start: u8, span: u8, i: usize, total: usize) -> u8 {
    if total == 0 {
        return start;
    }
    let offset = (u64::from(span) * i as u64 / total as u64) as u8;
    start.saturating_add(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn closures_are_observers() {
        let seen = RefCell::new(Vec::new());
        let observer = |p: u8, m: &str| seen.borrow_mut().push((p, m.to_string()));
        observer.report(5, "loading");
        observer.report(100, "done");
        assert_eq!(
            seen.into_inner(),
            vec![(5, "loading".to_string()), (100, "done".to_string())]
        );
    }

    #[test]
    fn scaled_progress() {
        assert_eq!(scaled(30, 40, 0, 20), 30);
        assert_eq!(scaled(30, 40, 10, 20), 50);
        assert_eq!(scaled(30, 40, 19, 20), 68);
        assert_eq!(scaled(80, 15, 3, 0), 80);
    }
}
