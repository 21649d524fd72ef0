use crate::error::ConfigError;
use crate::playback::PlaybackConfig;
use tracing::{debug, warn};

/// Environment variable prefix read by [`EnvOverrides`]
const ENV_PREFIX: &str = "FRAMESEQ_";

/// Sparse set of raw override values
///
/// Values are kept as the strings they were supplied as; parsing happens in
/// [`resolve`] so a bad value only drops that one override.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub sequence_path: Option<String>,
    pub fps: Option<String>,
    pub end: Option<String>,
    pub start: Option<String>,
}

impl Overrides {
    /// Store a value under one of the recognized keys; unknown keys are ignored
    fn set(&mut self, key: &str, value: String) {
        match key {
            "sequencePath" => self.sequence_path = Some(value),
            "fps" => self.fps = Some(value),
            "end" => self.end = Some(value),
            "start" => self.start = Some(value),
            _ => debug!("Ignoring unknown override key: {}", key),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sequence_path.is_none() && self.fps.is_none() && self.end.is_none() && self.start.is_none()
    }
}

/// Anything that can supply playback overrides
pub trait OverrideSource {
    fn read_overrides(&self) -> Result<Overrides, ConfigError>;
}

impl OverrideSource for Overrides {
    fn read_overrides(&self) -> Result<Overrides, ConfigError> {
        Ok(self.clone())
    }
}

/// URL query string such as `?sequencePath=/seq&fps=15&end=80&start=0`
#[derive(Debug, Clone)]
pub struct QueryString(pub String);

impl QueryString {
    pub fn new(query: impl Into<String>) -> Self {
        Self(query.into())
    }
}

impl OverrideSource for QueryString {
    fn read_overrides(&self) -> Result<Overrides, ConfigError> {
        let query = self.0.strip_prefix('?').unwrap_or(&self.0);
        let mut overrides = Overrides::default();

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_component(key)?;
            let value = decode_component(value)?;
            // Later duplicates lose, like URLSearchParams::get
            if !is_set(&overrides, &key) {
                overrides.set(&key, value);
            }
        }

        Ok(overrides)
    }
}

fn is_set(overrides: &Overrides, key: &str) -> bool {
    match key {
        "sequencePath" => overrides.sequence_path.is_some(),
        "fps" => overrides.fps.is_some(),
        "end" => overrides.end.is_some(),
        "start" => overrides.start.is_some(),
        _ => false,
    }
}

/// Decode `+` and `%XX` escapes of a query component
fn decode_component(raw: &str) -> Result<String, ConfigError> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => {
                let byte = raw
                    .get(i + 1..i + 3)
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                    .ok_or_else(|| ConfigError::MalformedEscape(raw.to_string()))?;
                out.push(byte);
                i += 3;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8(out).map_err(|_| ConfigError::InvalidUtf8)
}

/// Overrides read from `FRAMESEQ_SEQUENCE_PATH`, `FRAMESEQ_FPS`,
/// `FRAMESEQ_END` and `FRAMESEQ_START`
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides;

impl EnvOverrides {
    fn var(name: &str) -> Result<Option<String>, ConfigError> {
        let key = format!("{}{}", ENV_PREFIX, name);
        match std::env::var(&key) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode(key)),
        }
    }
}

impl OverrideSource for EnvOverrides {
    fn read_overrides(&self) -> Result<Overrides, ConfigError> {
        Ok(Overrides {
            sequence_path: Self::var("SEQUENCE_PATH")?,
            fps: Self::var("FPS")?,
            end: Self::var("END")?,
            start: Self::var("START")?,
        })
    }
}

/// Parse a raw numeric override, rejecting anything that is not a finite number
fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Merge overrides into a base configuration.
///
/// Invalid values fall back to the base value without error. If the source
/// itself cannot be read, a warning is logged and the base is returned as is.
pub fn resolve(base: &PlaybackConfig, source: &dyn OverrideSource) -> PlaybackConfig {
    let mut config = base.clone();

    let overrides = match source.read_overrides() {
        Ok(overrides) => overrides,
        Err(e) => {
            warn!("Failed to read sequence config overrides: {}", e);
            return config;
        }
    };

    if let Some(path) = overrides.sequence_path.filter(|p| !p.is_empty()) {
        config.base_path = path;
    }

    if let Some(fps) = overrides.fps.as_deref().and_then(parse_number) {
        config.fps = fps.max(1.0);
    } else if overrides.fps.is_some() {
        debug!("Ignoring non-numeric fps override: {:?}", overrides.fps);
    }

    // Fractional bounds are rounded inward to the frames they cover
    if let Some(end) = overrides.end.as_deref().and_then(parse_number) {
        config.end_frame = end.floor() as i64;
    }
    if let Some(start) = overrides.start.as_deref().and_then(parse_number) {
        config.start_frame = start.ceil() as i64;
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenSource;

    impl OverrideSource for BrokenSource {
        fn read_overrides(&self) -> Result<Overrides, ConfigError> {
            Err(ConfigError::NotUnicode("FRAMESEQ_FPS".to_string()))
        }
    }

    fn base() -> PlaybackConfig {
        PlaybackConfig {
            base_path: "/default".to_string(),
            fps: 15.0,
            start_frame: 1,
            end_frame: 80,
            ..Default::default()
        }
    }

    #[test]
    fn test_query_overrides_applied() {
        let query = QueryString::new("?sequencePath=/runs/take2&fps=24&end=40&start=3");
        let config = resolve(&base(), &query);
        assert_eq!(config.base_path, "/runs/take2");
        assert_eq!(config.fps, 24.0);
        assert_eq!(config.end_frame, 40);
        assert_eq!(config.start_frame, 3);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let query = QueryString::new("fps=fast&end=&start=abc&sequencePath=");
        let config = resolve(&base(), &query);
        assert_eq!(config, base());
    }

    #[test]
    fn test_fps_floored_to_one() {
        let config = resolve(&base(), &QueryString::new("fps=0"));
        assert_eq!(config.fps, 1.0);

        let config = resolve(&base(), &QueryString::new("fps=-12"));
        assert_eq!(config.fps, 1.0);

        let config = resolve(&base(), &QueryString::new("fps=2.5"));
        assert_eq!(config.fps, 2.5);
    }

    #[test]
    fn test_non_finite_rejected() {
        let config = resolve(&base(), &QueryString::new("fps=inf&end=NaN"));
        assert_eq!(config.fps, 15.0);
        assert_eq!(config.end_frame, 80);
    }

    #[test]
    fn test_fractional_bounds_round_inward() {
        let config = resolve(&base(), &QueryString::new("start=0.5&end=2.5"));
        assert_eq!(config.start_frame, 1);
        assert_eq!(config.end_frame, 2);
    }

    #[test]
    fn test_percent_decoding() {
        let overrides = QueryString::new("sequencePath=%2Fmy+frames%2Frun%201&fps=%2030%20")
            .read_overrides()
            .unwrap();
        assert_eq!(overrides.sequence_path.as_deref(), Some("/my frames/run 1"));

        let config = resolve(&base(), &QueryString::new("fps=%2030%20"));
        assert_eq!(config.fps, 30.0);
    }

    #[test]
    fn test_first_duplicate_wins() {
        let config = resolve(&base(), &QueryString::new("fps=10&fps=20"));
        assert_eq!(config.fps, 10.0);
    }

    #[test]
    fn test_malformed_query_keeps_base() {
        let query = QueryString::new("fps=30&sequencePath=%zz");
        assert!(matches!(
            query.read_overrides(),
            Err(ConfigError::MalformedEscape(_))
        ));
        assert_eq!(resolve(&base(), &query), base());
    }

    #[test]
    fn test_unreadable_source_keeps_base() {
        assert_eq!(resolve(&base(), &BrokenSource), base());
    }

    #[test]
    fn test_empty_query() {
        let overrides = QueryString::new("?").read_overrides().unwrap();
        assert!(overrides.is_empty());
        assert_eq!(resolve(&base(), &QueryString::new("")), base());
    }
}
