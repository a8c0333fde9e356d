//! Per-request progress bars fed by status polling.

use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use sharegrab_core::{Orchestrator, RequestId, RequestState, StatusRecord};

const POLL_INTERVAL: Duration = Duration::from_millis(200);
const BAR_TEMPLATE: &str = "{prefix:.bold} [{bar:30.cyan/blue}] {pos:>3}% {wide_msg}";

/// A submitted request and the link it was submitted for.
#[derive(Debug, Clone)]
pub(crate) struct TrackedRequest {
    pub url: String,
    pub id: RequestId,
}

/// Polls every request until it settles and returns the final records in input order.
///
/// With `show_bars` false the bars are drawn to a hidden target.
pub(crate) async fn track_requests(
    orchestrator: &Orchestrator,
    requests: &[TrackedRequest],
    show_bars: bool,
) -> Vec<StatusRecord> {
    let multi = if show_bars {
        MultiProgress::new()
    } else {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    };
    let style = ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");

    let bars: Vec<ProgressBar> = requests
        .iter()
        .map(|request| {
            let bar = multi.add(ProgressBar::new(100));
            bar.set_style(style.clone());
            bar.set_prefix(short_label(&request.url));
            bar
        })
        .collect();

    let mut settled: Vec<Option<StatusRecord>> = vec![None; requests.len()];
    while settled.iter().any(Option::is_none) {
        for ((request, bar), slot) in requests.iter().zip(&bars).zip(settled.iter_mut()) {
            if slot.is_some() {
                continue;
            }
            let record = orchestrator
                .get_status(&request.id)
                .unwrap_or_else(|| StatusRecord::failed("Request status was discarded", None));
            bar.set_position(bar_position(&record));
            match record.state {
                RequestState::Completed => bar.finish_with_message(record.message.clone()),
                RequestState::Failed => bar.abandon_with_message(record.message.clone()),
                _ => bar.set_message(record.message.clone()),
            }
            if record.state.is_terminal() {
                *slot = Some(record);
            }
        }
        if settled.iter().any(Option::is_none) {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    settled.into_iter().flatten().collect()
}

/// Bar position in percent for a status record.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bar_position(record: &StatusRecord) -> u64 {
    match record.state {
        RequestState::Completed => 100,
        _ => record
            .progress
            .map_or(0, |fraction| (fraction.clamp(0.0, 1.0) * 100.0).round() as u64),
    }
}

/// Trailing path segment of a share link, used as the bar prefix.
fn short_label(url: &str) -> String {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or(url)
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn test_bar_position_follows_progress() {
        assert_eq!(bar_position(&StatusRecord::queued()), 0);
        assert_eq!(bar_position(&StatusRecord::downloading("a.mp4", None)), 0);
        assert_eq!(
            bar_position(&StatusRecord::downloading("a.mp4", Some(0.426))),
            43
        );
    }

    #[test]
    fn test_bar_position_full_on_completion() {
        let record = StatusRecord::completed("a.mp4", Path::new("/tmp/a.mp4"), 10);
        assert_eq!(bar_position(&record), 100);
    }

    #[test]
    fn test_short_label_uses_last_segment() {
        assert_eq!(short_label("https://www.terabox.com/s/1abc"), "1abc");
        assert_eq!(short_label("https://www.terabox.com/s/1abc/"), "1abc");
        assert_eq!(short_label("plain"), "plain");
    }
}
