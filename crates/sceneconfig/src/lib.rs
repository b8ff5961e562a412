use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::Deserialize;
use scrolltrigger::{Scrub, SectionExtent, SectionLayout};

/// Number of texture slots exposed to the shader (`uTexture1..3`).
pub const MAX_TEXTURES: usize = 3;

/// Upper bound for the `sections = <count>` shorthand and explicit lists.
pub const MAX_SECTIONS: usize = 1024;

/// Longest accepted quiet period before a resize is applied.
pub const MAX_RESIZE_DEBOUNCE: Duration = Duration::from_secs(5);

/// Images loaded when the configuration does not name any, relative to the
/// configuration directory.
pub const DEFAULT_TEXTURES: [&str; MAX_TEXTURES] =
    ["images/11.webp", "images/12.webp", "images/17.webp"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneConfig {
    pub version: u32,
    #[serde(default = "default_textures")]
    pub textures: Vec<PathBuf>,
    #[serde(default)]
    pub shaders: Option<ShaderPaths>,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub renderer: RendererSettings,
    #[serde(default)]
    pub scroll: ScrollConfig,
    #[serde(default)]
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShaderPaths {
    pub vertex: Option<PathBuf>,
    pub fragment: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    pub fovy: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fovy: 70.0,
            near: 0.1,
            far: 1000.0,
            position: [0.0, 0.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererSettings {
    pub clear_color: String,
    pub max_pixel_ratio: f64,
    #[serde(deserialize_with = "deserialize_antialias")]
    pub antialias: AntialiasSetting,
    pub transparent: bool,
    pub vsync: bool,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            clear_color: "#000000".into(),
            max_pixel_ratio: 2.0,
            antialias: AntialiasSetting::Auto,
            transparent: true,
            vsync: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AntialiasSetting {
    Auto,
    Off,
    Samples2,
    Samples4,
    Samples8,
    Samples16,
}

impl AntialiasSetting {
    pub fn from_samples(samples: u32) -> Option<Self> {
        match samples {
            0 | 1 => Some(Self::Off),
            2 => Some(Self::Samples2),
            4 => Some(Self::Samples4),
            8 => Some(Self::Samples8),
            16 => Some(Self::Samples16),
            _ => None,
        }
    }

    pub fn samples(self) -> Option<u32> {
        match self {
            Self::Auto => None,
            Self::Off => Some(1),
            Self::Samples2 => Some(2),
            Self::Samples4 => Some(4),
            Self::Samples8 => Some(8),
            Self::Samples16 => Some(16),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScrollConfig {
    #[serde(deserialize_with = "deserialize_extents")]
    pub sections: Vec<SectionExtent>,
    #[serde(deserialize_with = "deserialize_extent")]
    pub trailing: SectionExtent,
    #[serde(deserialize_with = "deserialize_scrub")]
    pub scrub: Scrub,
    pub line_height: f32,
    #[serde(deserialize_with = "deserialize_duration")]
    pub resize_debounce: Duration,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            sections: vec![SectionExtent::Viewport(1.0); 3],
            trailing: SectionExtent::Viewport(1.0),
            scrub: Scrub::Linked,
            line_height: 100.0,
            resize_debounce: default_resize_debounce(),
        }
    }
}

impl ScrollConfig {
    pub fn layout(&self) -> Result<SectionLayout, ConfigError> {
        SectionLayout::new(self.sections.clone(), self.trailing)
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "scrollshade".into(),
            width: 1280,
            height: 720,
        }
    }
}

fn default_textures() -> Vec<PathBuf> {
    DEFAULT_TEXTURES.into_iter().map(PathBuf::from).collect()
}

fn default_resize_debounce() -> Duration {
    Duration::from_millis(100)
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            version: 1,
            textures: default_textures(),
            shaders: None,
            camera: CameraConfig::default(),
            renderer: RendererSettings::default(),
            scroll: ScrollConfig::default(),
            window: WindowConfig::default(),
        }
    }
}

impl SceneConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: SceneConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads, validates, and resolves relative paths against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&contents)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        let anchor = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        self.textures.iter_mut().for_each(anchor);
        if let Some(shaders) = self.shaders.as_mut() {
            shaders.vertex.iter_mut().for_each(anchor);
            shaders.fragment.iter_mut().for_each(anchor);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if self.textures.len() > MAX_TEXTURES {
            return Err(ConfigError::Invalid(format!(
                "{} textures configured; at most {MAX_TEXTURES} are supported",
                self.textures.len()
            )));
        }

        if self.scroll.sections.len() > MAX_SECTIONS {
            return Err(ConfigError::Invalid(format!(
                "{} scroll sections configured; at most {MAX_SECTIONS} are supported",
                self.scroll.sections.len()
            )));
        }
        self.scroll.layout()?;

        if self.scroll.resize_debounce > MAX_RESIZE_DEBOUNCE {
            return Err(ConfigError::Invalid(format!(
                "scroll.resize_debounce must be at most {} (got {})",
                humantime::format_duration(MAX_RESIZE_DEBOUNCE),
                humantime::format_duration(self.scroll.resize_debounce)
            )));
        }

        if !(self.scroll.line_height.is_finite() && self.scroll.line_height > 0.0) {
            return Err(ConfigError::Invalid(
                "scroll.line_height must be greater than zero".into(),
            ));
        }

        let camera = &self.camera;
        if !(camera.fovy > 0.0 && camera.fovy < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "camera.fovy must be between 0 and 180 degrees (got {})",
                camera.fovy
            )));
        }
        if !(camera.near > 0.0 && camera.near < camera.far) {
            return Err(ConfigError::Invalid(format!(
                "camera clip planes must satisfy 0 < near < far (got near={}, far={})",
                camera.near, camera.far
            )));
        }

        if !(self.renderer.max_pixel_ratio >= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "renderer.max_pixel_ratio must be at least 1 (got {})",
                self.renderer.max_pixel_ratio
            )));
        }
        parse_color(&self.renderer.clear_color).map_err(ConfigError::Invalid)?;

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(
                "window dimensions must be greater than zero".into(),
            ));
        }

        Ok(())
    }

    /// Clear color as linear RGBA components in `0.0..=1.0`.
    pub fn clear_color(&self) -> [f64; 4] {
        parse_color(&self.renderer.clear_color).unwrap_or([0.0, 0.0, 0.0, 1.0])
    }

    pub fn vertex_shader(&self) -> Option<&Path> {
        self.shaders.as_ref().and_then(|s| s.vertex.as_deref())
    }

    pub fn fragment_shader(&self) -> Option<&Path> {
        self.shaders.as_ref().and_then(|s| s.fragment.as_deref())
    }
}

/// Parses `#rgb`, `#rrggbb`, or `#rrggbbaa`.
pub fn parse_color(raw: &str) -> Result<[f64; 4], String> {
    let trimmed = raw.trim();
    let hex = trimmed
        .strip_prefix('#')
        .ok_or_else(|| format!("color '{trimmed}' must start with '#'"))?;
    if !hex.is_ascii() {
        return Err(format!("color '{trimmed}' contains invalid hex digits"));
    }
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).chain("ff".chars()).collect(),
        6 => format!("{hex}ff"),
        8 => hex.to_string(),
        _ => return Err(format!("color '{trimmed}' must have 3, 6, or 8 hex digits")),
    };
    let mut channels = [0.0; 4];
    for (index, channel) in channels.iter_mut().enumerate() {
        let byte = u8::from_str_radix(&expanded[index * 2..index * 2 + 2], 16)
            .map_err(|_| format!("color '{trimmed}' contains invalid hex digits"))?;
        *channel = f64::from(byte) / 255.0;
    }
    Ok(channels)
}

fn deserialize_extents<'de, D>(deserializer: D) -> Result<Vec<SectionExtent>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Count(u32),
        List(Vec<ExtentRepr>),
    }

    match Helper::deserialize(deserializer)? {
        Helper::Count(count) if count as usize > MAX_SECTIONS => Err(de::Error::custom(format!(
            "{count} scroll sections requested; at most {MAX_SECTIONS} are supported"
        ))),
        Helper::Count(count) => Ok(vec![SectionExtent::Viewport(1.0); count as usize]),
        Helper::List(items) => items
            .into_iter()
            .map(|item| item.into_extent().map_err(de::Error::custom))
            .collect(),
    }
}

fn deserialize_extent<'de, D>(deserializer: D) -> Result<SectionExtent, D::Error>
where
    D: Deserializer<'de>,
{
    ExtentRepr::deserialize(deserializer)?
        .into_extent()
        .map_err(de::Error::custom)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExtentRepr {
    Pixels(f64),
    Text(String),
}

impl ExtentRepr {
    fn into_extent(self) -> Result<SectionExtent, String> {
        match self {
            ExtentRepr::Pixels(value) => Ok(SectionExtent::Pixels(value as f32)),
            ExtentRepr::Text(raw) => SectionExtent::parse(&raw),
        }
    }
}

fn deserialize_scrub<'de, D>(deserializer: D) -> Result<Scrub, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Flag(bool),
        Seconds(f64),
        Text(String),
    }

    match Helper::deserialize(deserializer)? {
        Helper::Flag(true) => Ok(Scrub::Linked),
        Helper::Flag(false) => Err(de::Error::custom(
            "scrub = false is not supported; use true, \"linked\", or a lag duration",
        )),
        Helper::Seconds(seconds) => scrub_from_seconds(seconds).map_err(de::Error::custom),
        Helper::Text(raw) => parse_scrub(&raw).map_err(de::Error::custom),
    }
}

/// Parses `true`/`linked`, a number of seconds, or a humantime duration.
pub fn parse_scrub(raw: &str) -> Result<Scrub, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "" => Err("scrub must not be empty".into()),
        "true" | "linked" | "on" => Ok(Scrub::Linked),
        other => {
            if let Ok(seconds) = other.parse::<f64>() {
                return scrub_from_seconds(seconds);
            }
            humantime::parse_duration(other)
                .map(scrub_from_duration)
                .map_err(|err| format!("invalid scrub '{raw}': {err}"))
        }
    }
}

fn scrub_from_seconds(seconds: f64) -> Result<Scrub, String> {
    if seconds.is_nan() || seconds.is_sign_negative() || seconds.is_infinite() {
        return Err("scrub duration must be finite and non-negative".into());
    }
    Duration::try_from_secs_f64(seconds)
        .map(scrub_from_duration)
        .map_err(|_| format!("scrub duration of {seconds} seconds is too large"))
}

fn scrub_from_duration(duration: Duration) -> Scrub {
    if duration.is_zero() {
        Scrub::Linked
    } else {
        Scrub::Smoothed(duration)
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of milliseconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_millis(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_millis(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() || v.is_infinite() {
                return Err(E::custom("duration must be non-negative"));
            }
            Duration::try_from_secs_f64(v / 1000.0)
                .map_err(|_| E::custom(format!("duration of {v} milliseconds is too large")))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn deserialize_antialias<'de, D>(deserializer: D) -> Result<AntialiasSetting, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Str(String),
        Num(i64),
    }

    match Helper::deserialize(deserializer)? {
        Helper::Str(raw) => parse_antialias(&raw).map_err(de::Error::custom),
        Helper::Num(value) => {
            if value < 0 {
                return Err(de::Error::custom("antialias value must be non-negative"));
            }
            parse_antialias(&value.to_string()).map_err(de::Error::custom)
        }
    }
}

pub fn parse_antialias(raw: &str) -> Result<AntialiasSetting, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(AntialiasSetting::Auto),
        "off" | "none" | "disable" | "disabled" | "0" | "1" => Ok(AntialiasSetting::Off),
        "2" => Ok(AntialiasSetting::Samples2),
        "4" => Ok(AntialiasSetting::Samples4),
        "8" => Ok(AntialiasSetting::Samples8),
        "16" => Ok(AntialiasSetting::Samples16),
        other => Err(format!("invalid antialias setting '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
version = 1
textures = ["images/11.webp", "images/12.webp", "images/17.webp"]

[shaders]
vertex = "shaders/plane.vert"
fragment = "/opt/shaders/plane.frag"

[camera]
fovy = 60.0
position = [0.0, 0.0, 2.0]

[renderer]
clear_color = "#102030"
max_pixel_ratio = 1.5
antialias = 4
transparent = false

[scroll]
sections = ["100vh", 480, "50vh"]
trailing = "0px"
scrub = "500ms"
resize_debounce = "250ms"

[window]
title = "demo"
width = 800
height = 600
"##;

    #[test]
    fn parses_sample_config() {
        let config = SceneConfig::from_toml_str(SAMPLE).expect("config parses");
        assert_eq!(config.textures.len(), 3);
        assert_eq!(config.camera.fovy, 60.0);
        assert_eq!(config.camera.near, 0.1);
        assert_eq!(config.renderer.antialias, AntialiasSetting::Samples4);
        assert!(!config.renderer.transparent);
        assert!(config.renderer.vsync);
        assert_eq!(
            config.scroll.sections,
            vec![
                SectionExtent::Viewport(1.0),
                SectionExtent::Pixels(480.0),
                SectionExtent::Viewport(0.5),
            ]
        );
        assert_eq!(config.scroll.trailing, SectionExtent::Pixels(0.0));
        assert_eq!(config.scroll.scrub, Scrub::Smoothed(Duration::from_millis(500)));
        assert_eq!(config.scroll.resize_debounce, Duration::from_millis(250));
        assert_eq!(config.window.title, "demo");
        let color = config.clear_color();
        assert!((color[0] - 16.0 / 255.0).abs() < 1e-9);
        assert_eq!(color[3], 1.0);
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let config = SceneConfig::from_toml_str("version = 1").unwrap();
        assert_eq!(
            config.textures,
            vec![
                PathBuf::from("images/11.webp"),
                PathBuf::from("images/12.webp"),
                PathBuf::from("images/17.webp"),
            ]
        );
        assert!(config.shaders.is_none());
        assert_eq!(config.scroll.sections.len(), 3);
        assert_eq!(config.scroll.scrub, Scrub::Linked);
        assert_eq!(config.scroll.resize_debounce, Duration::from_millis(100));
        assert_eq!(config.renderer.max_pixel_ratio, 2.0);
        assert_eq!(config.clear_color(), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn section_count_shorthand() {
        let config = SceneConfig::from_toml_str("version = 1\n[scroll]\nsections = 5\n").unwrap();
        assert_eq!(config.scroll.sections.len(), 5);
    }

    #[test]
    fn empty_texture_list_disables_loading() {
        let config = SceneConfig::from_toml_str("version = 1\ntextures = []").unwrap();
        assert!(config.textures.is_empty());
    }

    #[test]
    fn default_textures_resolve_against_config_dir() {
        let mut config = SceneConfig::default();
        config.resolve_paths(Path::new("/etc/scrollshade"));
        assert_eq!(
            config.textures[2],
            PathBuf::from("/etc/scrollshade/images/17.webp")
        );
    }

    #[test]
    fn section_count_shorthand_is_capped() {
        let result = SceneConfig::from_toml_str("version = 1\n[scroll]\nsections = 4000000000\n");
        assert!(result.is_err());
        let at_limit = SceneConfig::from_toml_str("version = 1\n[scroll]\nsections = 1024\n");
        assert_eq!(at_limit.unwrap().scroll.sections.len(), MAX_SECTIONS);
    }

    #[test]
    fn oversized_durations_are_errors() {
        let cases = [
            "version = 1\n[scroll]\nscrub = 1e20",
            "version = 1\n[scroll]\nresize_debounce = 1e30",
            "version = 1\n[scroll]\nscrub = false",
        ];
        for case in cases {
            assert!(
                matches!(SceneConfig::from_toml_str(case), Err(ConfigError::Parse(_))),
                "expected parse failure for {case:?}"
            );
        }
    }

    #[test]
    fn resize_debounce_is_bounded() {
        let result = SceneConfig::from_toml_str(
            "version = 1\n[scroll]\nresize_debounce = \"300000000000years\"",
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        let ok = SceneConfig::from_toml_str("version = 1\n[scroll]\nresize_debounce = \"5s\"");
        assert_eq!(ok.unwrap().scroll.resize_debounce, MAX_RESIZE_DEBOUNCE);
    }

    #[test]
    fn rejects_invalid_configs() {
        let cases = [
            "version = 2",
            "version = 1\ntextures = [\"a\", \"b\", \"c\", \"d\"]",
            "version = 1\n[scroll]\nsections = []",
            "version = 1\n[scroll]\nsections = [\"-10vh\"]",
            "version = 1\n[scroll]\nline_height = 0.0",
            "version = 1\n[camera]\nfovy = 180.0",
            "version = 1\n[camera]\nnear = 10.0\nfar = 1.0",
            "version = 1\n[renderer]\nmax_pixel_ratio = 0.5",
            "version = 1\n[renderer]\nclear_color = \"black\"",
            "version = 1\n[window]\nwidth = 0",
        ];
        for case in cases {
            assert!(
                matches!(SceneConfig::from_toml_str(case), Err(ConfigError::Invalid(_))),
                "expected validation failure for {case:?}"
            );
        }
    }

    #[test]
    fn rejects_unknown_keys() {
        let result = SceneConfig::from_toml_str("version = 1\n[scroll]\nspeed = 2");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = SceneConfig::load(&path).unwrap();
        assert_eq!(config.textures[0], dir.path().join("images/11.webp"));
        assert_eq!(
            config.vertex_shader(),
            Some(dir.path().join("shaders/plane.vert").as_path())
        );
        assert_eq!(
            config.fragment_shader(),
            Some(Path::new("/opt/shaders/plane.frag"))
        );
    }

    #[test]
    fn parses_scrub_variants() {
        assert_eq!(parse_scrub("linked").unwrap(), Scrub::Linked);
        assert_eq!(parse_scrub("0").unwrap(), Scrub::Linked);
        assert_eq!(
            parse_scrub("1.5").unwrap(),
            Scrub::Smoothed(Duration::from_millis(1500))
        );
        assert_eq!(
            parse_scrub("300ms").unwrap(),
            Scrub::Smoothed(Duration::from_millis(300))
        );
        assert!(parse_scrub("-1").is_err());
        assert!(parse_scrub("1e20").is_err());
        assert!(parse_scrub("false").is_err());
        assert!(parse_scrub("soon").is_err());
    }

    #[test]
    fn parses_colors() {
        assert_eq!(parse_color("#fff").unwrap(), [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(parse_color("#00000000").unwrap(), [0.0; 4]);
        assert!(parse_color("000000").is_err());
        assert!(parse_color("#12345").is_err());
        assert!(parse_color("#zzzzzz").is_err());
    }
}
