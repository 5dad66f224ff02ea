//! CLI command implementations.

use crate::colors;
use crate::exit_codes::ExitCode;
use crate::CatalogKind;
use castkit_common::{
    validate, AudioEncoder, AudioSource, CapabilityFlags, MediaProjectionRequest,
    NormalizedRequest, OutputFormat, ValidationError, VideoEncoder, VideoSource, WireRequest,
};
use serde::Serialize;
use std::path::PathBuf;

/// One row of a catalog listing.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub id: i32,
    pub name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub audio_encoders: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub video_encoders: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_bitrate: Option<i32>,
    pub flags: CapabilityFlags,
}

impl CatalogEntry {
    fn new(id: i32, name: &'static str, flags: CapabilityFlags) -> Self {
        Self {
            id,
            name,
            extension: None,
            audio_encoders: Vec::new(),
            video_encoders: Vec::new(),
            recommended_bitrate: None,
            flags,
        }
    }

    fn detail(&self) -> String {
        if let Some(ext) = self.extension {
            let mut parts = vec![format!(".{}", ext)];
            if !self.audio_encoders.is_empty() {
                parts.push(format!("audio: {}", self.audio_encoders.join("/")));
            }
            if !self.video_encoders.is_empty() {
                parts.push(format!("video: {}", self.video_encoders.join("/")));
            }
            return parts.join("  ");
        }
        match self.recommended_bitrate {
            Some(bps) => format!("{} bps", bps),
            None => String::new(),
        }
    }
}

/// Build the catalog listing for one kind of capability.
pub fn catalog_entries(kind: &CatalogKind) -> Vec<CatalogEntry> {
    match kind {
        CatalogKind::Containers => OutputFormat::ALL
            .iter()
            .map(|f| CatalogEntry {
                extension: Some(f.extension()),
                audio_encoders: f.audio_encoders().iter().map(|e| e.display_name()).collect(),
                video_encoders: f.video_encoders().iter().map(|e| e.display_name()).collect(),
                ..CatalogEntry::new(f.id(), f.display_name(), f.flags())
            })
            .collect(),
        CatalogKind::AudioEncoders => AudioEncoder::ALL
            .iter()
            .map(|e| CatalogEntry {
                recommended_bitrate: Some(e.recommended_bitrate()),
                ..CatalogEntry::new(e.id(), e.display_name(), e.flags())
            })
            .collect(),
        CatalogKind::VideoEncoders => VideoEncoder::ALL
            .iter()
            .map(|e| CatalogEntry {
                recommended_bitrate: Some(e.recommended_bitrate()),
                ..CatalogEntry::new(e.id(), e.display_name(), e.flags())
            })
            .collect(),
        CatalogKind::AudioSources => AudioSource::ALL
            .iter()
            .map(|s| CatalogEntry::new(s.id(), s.display_name(), s.flags()))
            .collect(),
        CatalogKind::VideoSources => VideoSource::ALL
            .iter()
            .map(|s| CatalogEntry::new(s.id(), s.display_name(), s.flags()))
            .collect(),
    }
}

/// Print a catalog table.
pub fn catalog(kind: CatalogKind, json: bool) -> ExitCode {
    let entries = catalog_entries(&kind);

    if json {
        return print_json(&entries);
    }

    let name_width = entries.iter().map(|e| e.name.len()).max().unwrap_or(4).max(4);
    let detail_width = entries
        .iter()
        .map(|e| e.detail().len())
        .max()
        .unwrap_or(6)
        .max(6);

    println!(
        "{}  {}  {}  {}",
        colors::pad_left("ID", 3, colors::header),
        colors::pad_left("NAME", name_width, colors::header),
        colors::pad_left("DETAIL", detail_width, colors::header),
        colors::header("FLAGS")
    );
    println!(
        "{}  {}  {}  {}",
        "-".repeat(3),
        "-".repeat(name_width),
        "-".repeat(detail_width),
        "-".repeat(5)
    );
    for entry in &entries {
        println!(
            "{}  {:<name_width$}  {:<detail_width$}  {}",
            colors::pad_left(&entry.id.to_string(), 3, colors::number),
            entry.name,
            entry.detail(),
            colors::flags(entry.flags)
        );
    }
    ExitCode::Success
}

/// Read a request file in the wire format.
pub fn load_request(file: &str) -> Result<MediaProjectionRequest, String> {
    let expanded = shellexpand::tilde(file);
    let path = PathBuf::from(expanded.as_ref());
    let data = std::fs::read(&path).map_err(|e| format!("Failed to read {:?}: {}", path, e))?;
    let wire = WireRequest::from_json(&data).map_err(|e| e.to_string())?;
    wire.into_request().map_err(|e| e.to_string())
}

#[derive(Serialize)]
struct Verdict<'a> {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    request: Option<&'a NormalizedRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rule: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Validate a request file and print the normalized request or the rejection.
pub fn validate_file(file: &str, json: bool, quiet: bool) -> ExitCode {
    let request = match load_request(file) {
        Ok(request) => request,
        Err(e) => {
            if !quiet {
                eprintln!("{}", colors::error(&e));
            }
            return ExitCode::InvalidInput;
        }
    };

    match validate(&request) {
        Ok(normalized) => {
            if json {
                return print_json(&Verdict {
                    valid: true,
                    request: Some(&normalized),
                    rule: None,
                    message: None,
                });
            }
            if !quiet {
                print_normalized(&normalized);
            }
            ExitCode::Success
        }
        Err(err) => {
            if json {
                print_json(&Verdict {
                    valid: false,
                    request: None,
                    rule: Some(err.rule().as_str()),
                    message: Some(err.to_string()),
                });
            } else if !quiet {
                print_rejection(&err);
            }
            ExitCode::ValidationRejected
        }
    }
}

fn print_normalized(request: &NormalizedRequest) {
    println!("{}", colors::success("Request is valid"));
    println!(
        "  {}  {} (.{})",
        colors::pad_left("Container", 9, colors::bold),
        request.format(),
        request.format().extension()
    );

    match request.video() {
        Some(video) => {
            let size = match (video.width(), video.height()) {
                (Some(w), Some(h)) => format!("{}x{}", w, h),
                _ => "display size".to_string(),
            };
            println!(
                "  {}  {} from {}, {} bps @ {} fps, {}",
                colors::pad_left("Video", 9, colors::bold),
                video.encoder(),
                video.source(),
                video.bitrate(),
                video.fps(),
                size
            );
        }
        None => println!(
            "  {}  {}",
            colors::pad_left("Video", 9, colors::bold),
            colors::dim("none (audio only)")
        ),
    }

    let audio = request.audio();
    println!(
        "  {}  {} from {}, {} bps, {} ch, {} Hz",
        colors::pad_left("Audio", 9, colors::bold),
        audio.encoder(),
        audio.source(),
        audio.bitrate(),
        audio.channels(),
        audio.sample_rate()
    );

    let dir = request
        .output_directory()
        .map(|d| d.display().to_string())
        .unwrap_or_else(|| "<cache directory>".to_string());
    let name = request
        .file_name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("capture_<timestamp>.{}", request.format().extension()));
    println!(
        "  {}  {}",
        colors::pad_left("Output", 9, colors::bold),
        colors::path(&format!("{}/{}", dir, name))
    );

    let mut limits = Vec::new();
    if let Some(duration) = request.max_duration() {
        limits.push(format!("{:.1}s", duration.as_secs_f64()));
    }
    if let Some(bytes) = request.max_file_size() {
        limits.push(format!("{} bytes", bytes));
    }
    if !limits.is_empty() {
        println!(
            "  {}  {}",
            colors::pad_left("Limits", 9, colors::bold),
            limits.join(", ")
        );
    }

    for warning in request.warnings() {
        println!("{}", colors::warning(&warning.to_string()));
    }
}

fn print_rejection(err: &ValidationError) {
    eprintln!("{}", colors::error(&err.to_string()));
    eprintln!("  {} {}", colors::dim("rule:"), err.rule());
}

/// Show the effective service configuration, optionally writing it to the
/// config file first.
pub fn show_config(init: bool, json: bool) -> ExitCode {
    let config = castkit_service::config::load_config();

    if init {
        if let Err(e) = castkit_service::config::save_config(&config) {
            eprintln!("{}", colors::error(&e));
            return ExitCode::GeneralError;
        }
        if !json {
            println!("{}", colors::success("Configuration written"));
        }
    }

    if json {
        return print_json(&config);
    }

    println!(
        "{}  {}",
        colors::pad_left("Cache directory", 17, colors::bold),
        colors::path(&config.cache_directory().display().to_string())
    );
    println!(
        "{}  {} ms",
        colors::pad_left("File size poll", 17, colors::bold),
        config.limits.file_size_poll_ms
    );
    println!(
        "{}  {}",
        colors::pad_left("Log level", 17, colors::bold),
        config.logging.level
    );
    println!(
        "{}  {}",
        colors::pad_left("Log directory", 17, colors::bold),
        colors::path(&castkit_common::logging::log_dir().display().to_string())
    );
    ExitCode::Success
}

/// Show version information.
pub fn version(json: bool) {
    let version = env!("CARGO_PKG_VERSION");
    if json {
        println!(r#"{{"version":"{}"}}"#, version);
    } else {
        println!("castkit {}", version);
    }
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(out) => {
            println!("{}", out);
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("{}", colors::error(&format!("Failed to serialize output: {}", e)));
            ExitCode::GeneralError
        }
    }
}
