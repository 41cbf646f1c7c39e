//! Narration synthesis: one audio file per script line.
//!
//! Synthesis failures are retried once; a line that still fails keeps
//! `audio == None` and the encoder renders fixed-length silence in its
//! place. Losing a line's voice is acceptable, losing the item is not.

use std::path::Path;

use clipforge_core::retry::{with_retry, RetryPolicy};
use clipforge_core::scene::Scene;

use crate::error::{Phase, PipelineError};
use crate::services::SpeechSynthesizer;

/// Outcome counts for the narration phase.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NarrationReport {
    pub synthesized: usize,
    pub silent: usize,
}

/// Synthesize audio for every narration line across all scenes.
pub async fn synthesize_all(
    scenes: &mut [Scene],
    tts: &dyn SpeechSynthesizer,
    policy: RetryPolicy,
    out_dir: &Path,
) -> Result<NarrationReport, PipelineError> {
    tokio::fs::create_dir_all(out_dir)
        .await
        .map_err(|e| PipelineError::new(Phase::Narration, e))?;

    let mut report = NarrationReport::default();
    let mut line_index = 0usize;

    for scene in scenes.iter_mut() {
        for line in scene.lines.iter_mut() {
            let index = line_index;
            line_index += 1;

            let result = with_retry(
                policy,
                |_| true,
                |_| tts.synthesize(&line.text, index, out_dir),
            )
            .await;

            match result {
                Ok(path) => {
                    line.audio = Some(path);
                    report.synthesized += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        scene = scene.index,
                        line_index = index,
                        error = %e,
                        "Line synthesis failed permanently, will render silence",
                    );
                    line.audio = None;
                    report.silent += 1;
                }
            }
        }
    }

    tracing::info!(
        synthesized = report.synthesized,
        silent = report.silent,
        "Narration phase done",
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use clipforge_core::scene::SceneKind;
    use clipforge_tts::TtsError;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Fails synthesis for lines whose text contains "bad".
    struct FlakyTts {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SpeechSynthesizer for FlakyTts {
        async fn synthesize(
            &self,
            text: &str,
            line_index: usize,
            out_dir: &Path,
        ) -> Result<PathBuf, TtsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text.contains("bad") {
                Err(TtsError::EmptyAudio { line_index })
            } else {
                Ok(out_dir.join(format!("line_{line_index:04}.wav")))
            }
        }

        async fn health_check(&self) -> bool {
            true
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(2, Duration::from_millis(1), 2.0)
    }

    #[tokio::test(start_paused = true)]
    async fn failed_lines_become_silent_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let tts = FlakyTts { calls: AtomicUsize::new(0) };
        let mut scenes = vec![Scene::new(
            0,
            SceneKind::TextOnly,
            vec!["good line".into(), "bad line".into(), "another good".into()],
        )];

        let report = synthesize_all(&mut scenes, &tts, policy(), dir.path())
            .await
            .unwrap();

        assert_eq!(report, NarrationReport { synthesized: 2, silent: 1 });
        assert!(scenes[0].lines[0].audio.is_some());
        assert!(scenes[0].lines[1].audio.is_none());
        assert!(scenes[0].lines[2].audio.is_some());
        // The failing line was retried once.
        assert_eq!(tts.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn line_indices_are_global_across_scenes() {
        let dir = tempfile::tempdir().unwrap();
        let tts = FlakyTts { calls: AtomicUsize::new(0) };
        let mut scenes = vec![
            Scene::new(0, SceneKind::Intro, vec!["hook".into()]),
            Scene::new(1, SceneKind::TextOnly, vec!["body".into()]),
        ];
        synthesize_all(&mut scenes, &tts, policy(), dir.path())
            .await
            .unwrap();
        assert_eq!(
            scenes[1].lines[0].audio,
            Some(dir.path().join("line_0001.wav"))
        );
    }
}
