//! Final encode: scenes to one preview video.
//!
//! Per scene, the narration line files are concatenated into a scene
//! audio track (fixed-length silence stands in for lines that failed
//! synthesis), then a segment is rendered from the generated clip or,
//! when the scene has none, from a solid-color card. The segments are
//! concatenated and re-encoded into the final file. Hardware encoding
//! is probed once per process and cached; the probe failing means
//! software `libx264` everywhere.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tokio::sync::OnceCell;

use clipforge_core::scene::Scene;

/// Error type for encoder operations.
#[derive(Debug, thiserror::Error)]
pub enum EncoderError {
    #[error("ffmpeg/ffprobe binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("ffmpeg execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("encode produced no usable output: {0}")]
    EmptyOutput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Encode parameters, from worker config.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Seconds of silence substituted for a narration line with no audio.
    pub silence_secs: f32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 24,
            silence_secs: 2.5,
        }
    }
}

/// Final encode result.
#[derive(Debug, Clone)]
pub struct EncodeResult {
    pub video_path: PathBuf,
    /// Probed duration of the final file, when ffprobe could read it.
    pub duration_secs: Option<f64>,
}

static VIDEO_CODEC: OnceCell<&'static str> = OnceCell::const_new();

pub struct Encoder {
    config: EncoderConfig,
}

impl Encoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    /// Render all scenes into `output_path`. Intermediate files land in
    /// `work_dir`, which is created if missing. Scenes flagged as failed
    /// must be merged away before this runs.
    pub async fn encode(
        &self,
        scenes: &[Scene],
        work_dir: &Path,
        output_path: &Path,
    ) -> Result<EncodeResult, EncoderError> {
        if scenes.is_empty() {
            return Err(EncoderError::EmptyOutput("no scenes to encode".into()));
        }
        tokio::fs::create_dir_all(work_dir).await?;

        let codec = probe_video_codec().await;
        tracing::info!(codec, scenes = scenes.len(), "Starting final encode");

        let mut segments = Vec::with_capacity(scenes.len());
        for scene in scenes {
            let audio = self.assemble_scene_audio(scene, work_dir).await?;
            let segment = self
                .render_segment(scene, &audio, work_dir, codec)
                .await?;
            segments.push(segment);
        }

        self.concat_segments(&segments, work_dir, output_path, codec)
            .await?;

        let size = tokio::fs::metadata(output_path).await?.len();
        if size == 0 {
            return Err(EncoderError::EmptyOutput(
                output_path.to_string_lossy().to_string(),
            ));
        }

        let duration_secs = probe_duration(output_path).await;
        tracing::info!(
            path = %output_path.display(),
            size_bytes = size,
            duration_secs,
            "Final encode done",
        );
        Ok(EncodeResult {
            video_path: output_path.to_path_buf(),
            duration_secs,
        })
    }

    /// Concat the scene's line audio files into one track. Lines without
    /// audio get a shared silence file.
    async fn assemble_scene_audio(
        &self,
        scene: &Scene,
        work_dir: &Path,
    ) -> Result<PathBuf, EncoderError> {
        let silence = self.ensure_silence_file(work_dir).await?;
        let parts: Vec<&Path> = scene
            .lines
            .iter()
            .map(|line| line.audio.as_deref().unwrap_or(&silence))
            .collect();

        let out = work_dir.join(format!("scene_{:03}_audio.wav", scene.index));
        if let [single] = parts.as_slice() {
            // A one-line scene reuses its file directly, resampled to a
            // uniform format for the concat step later.
            run_ffmpeg(&[
                "-y".as_ref(),
                "-i".as_ref(),
                single.as_os_str(),
                "-ar".as_ref(),
                "44100".as_ref(),
                "-ac".as_ref(),
                "1".as_ref(),
                out.as_os_str(),
            ])
            .await?;
            return Ok(out);
        }

        let manifest_path = work_dir.join(format!("scene_{:03}_audio.txt", scene.index));
        tokio::fs::write(&manifest_path, concat_manifest(&parts)).await?;
        run_ffmpeg(&[
            "-y".as_ref(),
            "-f".as_ref(),
            "concat".as_ref(),
            "-safe".as_ref(),
            "0".as_ref(),
            "-i".as_ref(),
            manifest_path.as_os_str(),
            "-ar".as_ref(),
            "44100".as_ref(),
            "-ac".as_ref(),
            "1".as_ref(),
            out.as_os_str(),
        ])
        .await?;
        Ok(out)
    }

    /// Render one scene segment: the generated clip (looped and scaled)
    /// or a solid card, cut to the narration length.
    async fn render_segment(
        &self,
        scene: &Scene,
        audio: &Path,
        work_dir: &Path,
        codec: &str,
    ) -> Result<PathBuf, EncoderError> {
        let out = work_dir.join(format!("segment_{:03}.mp4", scene.index));
        let scale = format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,fps={fps}",
            w = self.config.width,
            h = self.config.height,
            fps = self.config.fps,
        );

        match &scene.clip_path {
            Some(clip) => {
                run_ffmpeg(&[
                    "-y".as_ref(),
                    "-stream_loop".as_ref(),
                    "-1".as_ref(),
                    "-i".as_ref(),
                    clip.as_os_str(),
                    "-i".as_ref(),
                    audio.as_os_str(),
                    "-shortest".as_ref(),
                    "-vf".as_ref(),
                    scale.as_ref(),
                    "-c:v".as_ref(),
                    codec.as_ref(),
                    "-c:a".as_ref(),
                    "aac".as_ref(),
                    out.as_os_str(),
                ])
                .await?;
            }
            None => {
                let card = format!(
                    "color=c=0x101018:s={}x{}:r={}",
                    self.config.width, self.config.height, self.config.fps,
                );
                run_ffmpeg(&[
                    "-y".as_ref(),
                    "-f".as_ref(),
                    "lavfi".as_ref(),
                    "-i".as_ref(),
                    card.as_ref(),
                    "-i".as_ref(),
                    audio.as_os_str(),
                    "-shortest".as_ref(),
                    "-c:v".as_ref(),
                    codec.as_ref(),
                    "-c:a".as_ref(),
                    "aac".as_ref(),
                    out.as_os_str(),
                ])
                .await?;
            }
        }
        Ok(out)
    }

    /// Concat all segments and re-encode into the final file.
    async fn concat_segments(
        &self,
        segments: &[PathBuf],
        work_dir: &Path,
        output_path: &Path,
        codec: &str,
    ) -> Result<(), EncoderError> {
        let parts: Vec<&Path> = segments.iter().map(PathBuf::as_path).collect();
        let manifest_path = work_dir.join("segments.txt");
        tokio::fs::write(&manifest_path, concat_manifest(&parts)).await?;

        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        run_ffmpeg(&[
            "-y".as_ref(),
            "-f".as_ref(),
            "concat".as_ref(),
            "-safe".as_ref(),
            "0".as_ref(),
            "-i".as_ref(),
            manifest_path.as_os_str(),
            "-c:v".as_ref(),
            codec.as_ref(),
            "-c:a".as_ref(),
            "aac".as_ref(),
            "-movflags".as_ref(),
            "+faststart".as_ref(),
            output_path.as_os_str(),
        ])
        .await
    }

    /// Write (once) the silence file substituted for unsynthesized lines.
    async fn ensure_silence_file(&self, work_dir: &Path) -> Result<PathBuf, EncoderError> {
        let path = work_dir.join("silence.wav");
        if tokio::fs::try_exists(&path).await? {
            return Ok(path);
        }
        let source = format!(
            "anullsrc=r=44100:cl=mono:d={:.2}",
            self.config.silence_secs
        );
        run_ffmpeg(&[
            "-y".as_ref(),
            "-f".as_ref(),
            "lavfi".as_ref(),
            "-i".as_ref(),
            source.as_ref(),
            path.as_os_str(),
        ])
        .await?;
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Process helpers
// ---------------------------------------------------------------------------

async fn run_ffmpeg(args: &[&std::ffi::OsStr]) -> Result<(), EncoderError> {
    let output = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error"])
        .args(args)
        .output()
        .await
        .map_err(EncoderError::NotFound)?;

    if !output.status.success() {
        return Err(EncoderError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }
    Ok(())
}

/// Probe once whether the NVENC hardware encoder works on this host.
pub async fn probe_video_codec() -> &'static str {
    *VIDEO_CODEC
        .get_or_init(|| async {
            let probe = Command::new("ffmpeg")
                .args([
                    "-hide_banner",
                    "-f",
                    "lavfi",
                    "-i",
                    "color=c=black:s=64x64:d=0.1",
                    "-frames:v",
                    "1",
                    "-c:v",
                    "h264_nvenc",
                    "-f",
                    "null",
                    "-",
                ])
                .output()
                .await;
            match probe {
                Ok(out) if out.status.success() => "h264_nvenc",
                _ => {
                    tracing::info!("NVENC probe failed, falling back to libx264");
                    "libx264"
                }
            }
        })
        .await
}

/// Read the container duration of a finished file. Best effort.
async fn probe_duration(path: &Path) -> Option<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-show_entries",
            "format=duration",
            "-of",
            "csv=p=0",
        ])
        .arg(path)
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout).trim().parse().ok()
}

/// Build a concat demuxer manifest. Single quotes in paths are escaped
/// the way the demuxer expects.
fn concat_manifest(parts: &[&Path]) -> String {
    let mut manifest = String::new();
    for part in parts {
        let escaped = part.to_string_lossy().replace('\'', "'\\''");
        manifest.push_str(&format!("file '{escaped}'\n"));
    }
    manifest
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_lists_files_in_order() {
        let a = PathBuf::from("/work/segment_000.mp4");
        let b = PathBuf::from("/work/segment_001.mp4");
        let manifest = concat_manifest(&[a.as_path(), b.as_path()]);
        assert_eq!(
            manifest,
            "file '/work/segment_000.mp4'\nfile '/work/segment_001.mp4'\n"
        );
    }

    #[test]
    fn manifest_escapes_single_quotes() {
        let tricky = PathBuf::from("/work/it's here.wav");
        let manifest = concat_manifest(&[tricky.as_path()]);
        assert_eq!(manifest, "file '/work/it'\\''s here.wav'\n");
    }

    #[test]
    fn default_config_is_portrait_short_form() {
        let config = EncoderConfig::default();
        assert!(config.height > config.width);
        assert!(config.silence_secs > 0.0);
    }
}
