//! Duration probing and tool discovery for FFmpeg binaries.
//!
//! This module shells out to `ffprobe` (and locates `ffmpeg` for the
//! thumbnail pipeline). Shelling out is more reliable than bindings and
//! works on every platform where the tools are installed.
//!
//! Install FFmpeg:
//! - Windows: `winget install Gyan.FFmpeg`
//! - macOS: `brew install ffmpeg`
//! - Linux: `apt install ffmpeg` or equivalent

use std::path::Path;
use std::process::Command;

use crate::error::Error;

/// Common installation paths for the FFmpeg tools on Windows
#[cfg(windows)]
const FFPROBE_PATHS: &[&str] = &[
    "ffprobe", // In PATH
    r"C:\Program Files\FFmpeg\bin\ffprobe.exe",
    r"C:\ffmpeg\bin\ffprobe.exe",
];

#[cfg(windows)]
const FFMPEG_PATHS: &[&str] = &[
    "ffmpeg", // In PATH
    r"C:\Program Files\FFmpeg\bin\ffmpeg.exe",
    r"C:\ffmpeg\bin\ffmpeg.exe",
];

#[cfg(not(windows))]
const FFPROBE_PATHS: &[&str] = &[
    "ffprobe", // In PATH
    "/usr/bin/ffprobe",
    "/usr/local/bin/ffprobe",
    "/opt/homebrew/bin/ffprobe",
];

#[cfg(not(windows))]
const FFMPEG_PATHS: &[&str] = &[
    "ffmpeg", // In PATH
    "/usr/bin/ffmpeg",
    "/usr/local/bin/ffmpeg",
    "/opt/homebrew/bin/ffmpeg",
];

fn find_tool(candidates: &'static [&'static str]) -> Option<&'static str> {
    candidates
        .iter()
        .find(|&path| {
            Command::new(path)
                .arg("-version")
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
        })
        .map(|v| v as _)
}

/// Find the ffprobe executable, checking common installation paths
pub fn find_ffprobe() -> Option<&'static str> {
    find_tool(FFPROBE_PATHS)
}

/// Find the ffmpeg executable, checking common installation paths
pub fn find_ffmpeg() -> Option<&'static str> {
    find_tool(FFMPEG_PATHS)
}

/// Probe a video file's duration in seconds.
pub fn probe_duration(path: &Path) -> Result<f64, Error> {
    let ffprobe = find_ffprobe().ok_or_else(|| {
        Error::probe(
            path,
            "ffprobe not found. Please install FFmpeg: https://ffmpeg.org/download.html",
        )
    })?;

    let output = Command::new(ffprobe)
        .args(["-v", "error", "-show_entries", "format=duration", "-of", "json"])
        .arg(path)
        .output()
        .map_err(|e| Error::probe(path, format!("Failed to run ffprobe: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::probe(
            path,
            format!("ffprobe failed: {}", stderr.trim()),
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_ffprobe_json(path, &stdout)
}

/// Parse the JSON output from ffprobe. Duration arrives as a decimal
/// string inside the `format` object.
fn parse_ffprobe_json(path: &Path, json: &str) -> Result<f64, Error> {
    let parsed: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| Error::probe(path, format!("Failed to parse ffprobe output: {}", e)))?;

    parsed
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| Error::probe(path, "ffprobe reported no duration"))
}

#[derive(serde::Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
}

#[derive(serde::Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Check if ffprobe is available on the system
pub fn is_ffprobe_available() -> bool {
    find_ffprobe().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ffprobe_json() {
        let json = r#"{"format": {"duration": "180.523000"}}"#;
        let duration = parse_ffprobe_json(Path::new("/v/a.mp4"), json).unwrap();
        assert!((duration - 180.523).abs() < 1e-6);
    }

    #[test]
    fn test_parse_ffprobe_json_missing_duration() {
        let json = r#"{"format": {}}"#;
        assert!(parse_ffprobe_json(Path::new("/v/a.mp4"), json).is_err());
        assert!(parse_ffprobe_json(Path::new("/v/a.mp4"), "{}").is_err());
    }

    #[test]
    fn test_parse_ffprobe_json_rejects_garbage_duration() {
        let json = r#"{"format": {"duration": "N/A"}}"#;
        assert!(parse_ffprobe_json(Path::new("/v/a.mp4"), json).is_err());
    }

    #[test]
    fn test_is_ffprobe_available() {
        // This test just ensures the function doesn't panic
        let _ = is_ffprobe_available();
    }

    #[test]
    fn test_probe_nonexistent_file() {
        let result = probe_duration(Path::new("/nonexistent/file.mp4"));
        // Should fail (either ffprobe not found or file not found)
        assert!(result.is_err());
    }
}
