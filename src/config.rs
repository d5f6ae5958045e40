use anyhow::{Context, Result};

use crate::error::SketchError;
use crate::geometry::icosahedron_buffer_bytes;
use crate::settings::SettingsOption;

pub const USAGE: &str = "Usage: bloom-sketch [--detail <n>] [--size <W>x<H>] [--exposure <v>] \
[--strength <v>] [--radius <v>] [--strict-shaders] [--summary-only] [--frames <n>] [--dump-shaders]";

/// Start-up options of the sketch. Defaults reproduce the stock scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SketchConfig {
    /// Subdivision level of the icosahedron.
    pub detail: u32,
    pub width: u32,
    pub height: u32,
    pub exposure: Option<f32>,
    pub strength: Option<f32>,
    pub radius: Option<f32>,
    /// Fail on a missing shader anchor instead of logging it.
    pub strict_shaders: bool,
    pub summary_only: bool,
    /// Ticks simulated by the summary run.
    pub frames: u32,
    pub dump_shaders: bool,
    pub help: bool,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            detail: 400,
            width: 1280,
            height: 720,
            exposure: None,
            strength: None,
            radius: None,
            strict_shaders: false,
            summary_only: false,
            frames: 3,
            dump_shaders: false,
            help: false,
        }
    }
}

impl SketchConfig {
    /// Parses command-line arguments, program name excluded.
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--detail" => {
                    config.detail = parse_value(&arg, args.next())?;
                    check_detail(config.detail)?;
                }
                "--size" => {
                    let value = required(&arg, args.next())?;
                    (config.width, config.height) = parse_size(&value)?;
                }
                "--exposure" => config.exposure = Some(parse_setting(&arg, args.next())?),
                "--strength" => config.strength = Some(parse_setting(&arg, args.next())?),
                "--radius" => config.radius = Some(parse_setting(&arg, args.next())?),
                "--frames" => config.frames = parse_value(&arg, args.next())?,
                "--strict-shaders" => config.strict_shaders = true,
                "--summary-only" => config.summary_only = true,
                "--dump-shaders" => config.dump_shaders = true,
                "-h" | "--help" => config.help = true,
                other => {
                    return Err(SketchError::Config(format!(
                        "unknown argument: {other}\n{USAGE}"
                    ))
                    .into());
                }
            }
        }
        Ok(config)
    }

    /// Panel settings with the command-line overrides applied.
    pub fn settings(&self) -> SettingsOption {
        let mut settings = SettingsOption::default();
        if let Some(exposure) = self.exposure {
            settings.exposure = exposure;
        }
        if let Some(strength) = self.strength {
            settings.strength = strength;
        }
        if let Some(radius) = self.radius {
            settings.radius = radius;
        }
        settings
    }
}

fn required(flag: &str, value: Option<String>) -> Result<String> {
    value.ok_or_else(|| SketchError::Config(format!("{flag} expects a value")).into())
}

fn parse_value<T>(flag: &str, value: Option<String>) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = required(flag, value)?;
    value
        .parse()
        .with_context(|| format!("invalid value for {flag}: {value}"))
}

fn parse_setting(flag: &str, value: Option<String>) -> Result<f32> {
    let parsed: f32 = parse_value(flag, value)?;
    if !parsed.is_finite() {
        return Err(SketchError::Config(format!("{flag} expects a finite number, got {parsed}")).into());
    }
    Ok(parsed)
}

/// Rejects subdivision levels whose mesh buffers exceed what a default
/// wgpu device accepts.
pub fn check_detail(detail: u32) -> Result<(), SketchError> {
    let limit = wgpu::Limits::default().max_buffer_size;
    let (vertex_bytes, index_bytes) = icosahedron_buffer_bytes(detail);
    let largest = vertex_bytes.max(index_bytes);
    if largest > limit {
        return Err(SketchError::Config(format!(
            "--detail {detail} needs a {largest} byte mesh buffer, above the {limit} byte limit"
        )));
    }
    Ok(())
}

fn parse_size(value: &str) -> Result<(u32, u32)> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| SketchError::Config(format!("size must look like 1280x720, got {value}")))?;
    let width: u32 = width
        .parse()
        .with_context(|| format!("invalid width in {value}"))?;
    let height: u32 = height
        .parse()
        .with_context(|| format!("invalid height in {value}"))?;
    if width == 0 || height == 0 {
        return Err(SketchError::ZeroViewport { width, height }.into());
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<SketchConfig> {
        SketchConfig::from_args(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn defaults_match_the_stock_scene() {
        let config = parse(&[]).unwrap();
        assert_eq!(config, SketchConfig::default());
        assert_eq!(config.detail, 400);
        assert_eq!(config.settings(), SettingsOption::default());
    }

    #[test]
    fn parses_every_flag() {
        let config = parse(&[
            "--detail",
            "12",
            "--size",
            "640x480",
            "--exposure",
            "0.5",
            "--strength",
            "1.5",
            "--radius",
            "-2",
            "--frames",
            "7",
            "--strict-shaders",
            "--summary-only",
            "--dump-shaders",
        ])
        .unwrap();
        assert_eq!(config.detail, 12);
        assert_eq!((config.width, config.height), (640, 480));
        assert_eq!(config.frames, 7);
        assert!(config.strict_shaders && config.summary_only && config.dump_shaders);
        let settings = config.settings();
        assert_eq!(settings.exposure, 0.5);
        assert_eq!(settings.strength, 1.5);
        assert_eq!(settings.radius, -2.0);
        assert_eq!(settings.threshold, 0.0);
    }

    #[test]
    fn rejects_unknown_and_malformed_arguments() {
        let err = parse(&["--bogus"]).unwrap_err();
        assert!(err.to_string().contains("unknown argument: --bogus"));
        assert!(parse(&["--detail"]).is_err());
        assert!(parse(&["--detail", "many"]).is_err());
        assert!(parse(&["--size", "640"]).is_err());
    }

    #[test]
    fn rejects_non_finite_settings() {
        for flag in ["--exposure", "--strength", "--radius"] {
            for value in ["NaN", "inf", "-inf"] {
                let err = parse(&[flag, value]).unwrap_err();
                assert!(matches!(
                    err.downcast_ref::<SketchError>(),
                    Some(SketchError::Config(_))
                ));
            }
        }
    }

    #[test]
    fn detail_is_bounded_by_the_buffer_limit() {
        assert_eq!(parse(&["--detail", "1055"]).unwrap().detail, 1055);
        let err = parse(&["--detail", "1056"]).unwrap_err();
        assert!(err.to_string().contains("byte limit"));
        assert!(parse(&["--detail", "4294967295"]).is_err());
    }

    #[test]
    fn zero_size_is_a_typed_error() {
        let err = parse(&["--size", "0x480"]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SketchError>(),
            Some(SketchError::ZeroViewport { width: 0, height: 480 })
        ));
    }
}
