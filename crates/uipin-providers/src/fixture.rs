//! Deterministic fixture execution for demos and tests.
//!
//! When fixture mode is on, an adapter skips its CLI entirely and plays a
//! short scripted run: two running events with percentages, then a
//! completed result whose changed file is guessed from the pinned
//! element's `data-testid`.

use crate::adapter::{ProviderProgress, ProviderResult, ProviderTaskInput};
use std::time::Duration;
use tokio::sync::mpsc;
use uipin_core::UiChangePacket;

const STEP_DELAY: Duration = Duration::from_millis(150);

/// The file a fixture run pretends to have changed.
pub fn mock_changed_file(packet: &UiChangePacket) -> String {
    match packet.element.attribute("data-testid") {
        Some(test_id) if !test_id.is_empty() => format!("src/components/{}.tsx", test_id),
        _ => "src/components/ExampleComponent.tsx".to_string(),
    }
}

/// Play the scripted fixture run for one session.
pub async fn run_fixture(
    input: &ProviderTaskInput,
    progress: &mpsc::UnboundedSender<ProviderProgress>,
) -> ProviderResult {
    let _ = progress.send(ProviderProgress::running("Scanning repository", Some(25.0)));
    tokio::time::sleep(STEP_DELAY).await;

    let _ = progress.send(ProviderProgress::running("Applying UI changes", Some(80.0)));
    tokio::time::sleep(STEP_DELAY).await;

    let summary = if input.dry_run {
        "Dry run completed"
    } else {
        "Applied UI request"
    };
    ProviderResult::completed(summary, vec![mock_changed_file(&input.packet)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture_input;
    use uipin_core::TerminalStatus;

    #[tokio::test(start_paused = true)]
    async fn test_fixture_script() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let input = fixture_input("save-button", false);

        let result = run_fixture(&input, &tx).await;
        drop(tx);

        let first = rx.recv().await.expect("first event");
        assert_eq!(first.message, "Scanning repository");
        assert_eq!(first.percent, Some(25.0));

        let second = rx.recv().await.expect("second event");
        assert_eq!(second.message, "Applying UI changes");
        assert_eq!(second.percent, Some(80.0));
        assert!(rx.recv().await.is_none());

        assert_eq!(result.status, TerminalStatus::Completed);
        assert_eq!(result.summary, "Applied UI request");
        assert_eq!(result.changed_files, vec!["src/components/save-button.tsx"]);
        assert!(result.error_code.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixture_dry_run_summary() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = run_fixture(&fixture_input("save-button", true), &tx).await;
        assert_eq!(result.summary, "Dry run completed");
    }

    #[test]
    fn test_mock_changed_file_fallback() {
        let input = fixture_input("", false);
        assert_eq!(
            mock_changed_file(&input.packet),
            "src/components/ExampleComponent.tsx"
        );
    }
}
