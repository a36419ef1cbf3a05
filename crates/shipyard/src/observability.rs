//! Observability setup: structured JSONL logging.
//!
//! **Important**: This module never writes to stdout, which carries command
//! output and `--json` reports. Logs go to a file, or to stderr when no log
//! location is writable.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Map, Value};
use std::fs::OpenOptions;
use std::io::Write;
use tracing::Event;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

const ENV_LOG_PATH: &str = "SHIPYARD_LOG_PATH";
const ENV_LOG_DIR: &str = "SHIPYARD_LOG_DIR";
const LOG_FILE_SUFFIX: &str = ".jsonl";

/// Configuration for observability setup.
#[derive(Clone, Debug)]
pub struct ObservabilityConfig {
    /// Service name written into every log entry and used for the file name.
    pub service: String,
    /// Directory for JSONL log files from config (`log_dir`).
    pub log_dir: Option<Utf8PathBuf>,
}

impl ObservabilityConfig {
    /// Config for this binary, with the `log_dir` setting from config.
    pub fn from_env_with_overrides(log_dir: Option<Utf8PathBuf>) -> Self {
        Self {
            service: env!("CARGO_PKG_NAME").to_string(),
            log_dir,
        }
    }
}

/// Where the log file lives.
#[derive(Clone, Debug, PartialEq, Eq)]
struct LogTarget {
    dir: Utf8PathBuf,
    file_name: String,
}

/// Guard that must be held for the lifetime of the application so buffered
/// log lines are flushed on exit.
pub struct ObservabilityGuard {
    _log_guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Initialize logging.
///
/// Returns a guard that must be held for the application lifetime.
pub fn init_observability(
    cfg: &ObservabilityConfig,
    env_filter: EnvFilter,
) -> Result<ObservabilityGuard> {
    let (writer, guard) = match resolve_log_target(&cfg.service, cfg.log_dir.as_deref()) {
        Ok(target) => {
            let appender = tracing_appender::rolling::daily(&target.dir, &target.file_name);
            tracing_appender::non_blocking(appender)
        }
        Err(err) => {
            // stderr, never stdout.
            eprintln!("Warning: {err:#}. Falling back to stderr logging.");
            tracing_appender::non_blocking(std::io::stderr())
        }
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(JsonLogLayer::new(writer, cfg.service.clone()))
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    tracing::debug!("observability initialized");

    Ok(ObservabilityGuard { _log_guard: guard })
}

/// Build an `EnvFilter` based on CLI flags and environment.
///
/// Priority: quiet flag > verbose flag > RUST_LOG env > config level
pub fn env_filter(quiet: bool, verbose: u8, default_level: &str) -> EnvFilter {
    if quiet {
        return EnvFilter::new("error");
    }

    match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    }
}

// ============================================================================
// JSON Log Layer
// ============================================================================

/// Writes one JSON object per event, with the fields of enclosing spans.
struct JsonLogLayer<W> {
    writer: W,
    service: String,
}

impl<W> JsonLogLayer<W> {
    const fn new(writer: W, service: String) -> Self {
        Self { writer, service }
    }
}

impl<S, W> tracing_subscriber::Layer<S> for JsonLogLayer<W>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: LayerContext<'_, S>,
    ) {
        if let Some(span) = ctx.span(id) {
            let mut fields = JsonVisitor::default();
            attrs.record(&mut fields);
            span.extensions_mut().insert(fields);
        }
    }

    fn on_record(
        &self,
        id: &tracing::span::Id,
        values: &tracing::span::Record<'_>,
        ctx: LayerContext<'_, S>,
    ) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        match extensions.get_mut::<JsonVisitor>() {
            Some(fields) => values.record(fields),
            None => {
                let mut fields = JsonVisitor::default();
                values.record(&mut fields);
                extensions.insert(fields);
            }
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: LayerContext<'_, S>) {
        let meta = event.metadata();
        let mut entry = Map::new();
        entry.insert("timestamp".into(), Value::String(format_timestamp()));
        entry.insert("level".into(), meta.level().as_str().to_lowercase().into());
        entry.insert("service".into(), self.service.clone().into());
        entry.insert("target".into(), meta.target().into());

        // Outermost span first, so inner fields win on conflicts.
        if let Some(scope) = ctx.event_scope(event) {
            let mut names = Vec::new();
            for span in scope.from_root() {
                names.push(Value::String(span.name().to_string()));
                if let Some(fields) = span.extensions().get::<JsonVisitor>() {
                    entry.extend(fields.values.clone());
                }
            }
            entry.insert("spans".into(), Value::Array(names));
        }

        let mut fields = JsonVisitor::default();
        event.record(&mut fields);
        entry.extend(fields.values);

        let mut writer = self.writer.make_writer();
        if serde_json::to_writer(&mut writer, &Value::Object(entry)).is_ok() {
            let _ = writer.write_all(b"\n");
        }
    }
}

/// Collects span or event fields as JSON values.
#[derive(Clone, Debug, Default)]
struct JsonVisitor {
    values: Map<String, Value>,
}

impl JsonVisitor {
    fn put(&mut self, field: &tracing::field::Field, value: Value) {
        self.values.insert(field.name().to_string(), value);
    }
}

impl tracing::field::Visit for JsonVisitor {
    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.put(field, Value::Bool(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.put(field, value.into());
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.put(field, value.into());
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        if let Some(number) = serde_json::Number::from_f64(value) {
            self.put(field, Value::Number(number));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.put(field, value.into());
    }

    fn record_error(
        &mut self,
        field: &tracing::field::Field,
        value: &(dyn std::error::Error + 'static),
    ) {
        self.put(field, value.to_string().into());
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.put(field, format!("{value:?}").into());
    }
}

/// RFC 3339 UTC timestamp with millisecond precision.
fn format_timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let secs = now.as_secs();
    let (year, month, day) = civil_from_days((secs / 86_400) as i64);
    let secs_of_day = secs % 86_400;

    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{:03}Z",
        secs_of_day / 3600,
        (secs_of_day % 3600) / 60,
        secs_of_day % 60,
        now.subsec_millis()
    )
}

/// Days since 1970-01-01 to a proleptic Gregorian (year, month, day).
const fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097) as u32;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe as i64 + era * 400 + if month <= 2 { 1 } else { 0 };
    (year, month, day)
}

// ============================================================================
// Log Target Resolution
// ============================================================================

fn resolve_log_target(service: &str, config_dir: Option<&Utf8Path>) -> Result<LogTarget> {
    let var = |key: &str| {
        std::env::var(key)
            .ok()
            .filter(|v| !v.is_empty())
            .map(Utf8PathBuf::from)
    };
    resolve_log_target_with(
        service,
        var(ENV_LOG_PATH),
        var(ENV_LOG_DIR),
        config_dir.map(Utf8Path::to_path_buf),
    )
}

/// Precedence: explicit file, env dir, config dir, then the first writable
/// fallback (platform data dir, system temp dir).
fn resolve_log_target_with(
    service: &str,
    path_override: Option<Utf8PathBuf>,
    dir_override: Option<Utf8PathBuf>,
    config_dir: Option<Utf8PathBuf>,
) -> Result<LogTarget> {
    if let Some(path) = path_override {
        return log_target_from_path(&path);
    }

    let file_name = format!("{service}{LOG_FILE_SUFFIX}");
    if let Some(dir) = dir_override.or(config_dir) {
        ensure_writable(&dir, &file_name)?;
        return Ok(LogTarget { dir, file_name });
    }

    let data_dir = directories::ProjectDirs::from("", "", service)
        .map(|dirs| dirs.data_local_dir().join("logs"));
    let candidates = data_dir
        .into_iter()
        .chain(Some(std::env::temp_dir().join(service)))
        .filter_map(|dir| Utf8PathBuf::from_path_buf(dir).ok());

    for dir in candidates {
        if ensure_writable(&dir, &file_name).is_ok() {
            return Ok(LogTarget { dir, file_name });
        }
    }

    anyhow::bail!("no writable log directory found")
}

fn log_target_from_path(path: &Utf8Path) -> Result<LogTarget> {
    let file_name = path
        .file_name()
        .with_context(|| format!("{ENV_LOG_PATH} must include a file name"))?
        .to_string();
    let dir = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
        _ => Utf8PathBuf::from("."),
    };
    ensure_writable(&dir, &file_name)?;
    Ok(LogTarget { dir, file_name })
}

fn ensure_writable(dir: &Utf8Path, file_name: &str) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {dir}"))?;
    let path = dir.join(file_name);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {path}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tmp_dir() -> (TempDir, Utf8PathBuf) {
        let tmp = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        (tmp, dir)
    }

    #[test]
    fn env_filter_quiet_overrides() {
        assert_eq!(env_filter(true, 2, "info").to_string(), "error");
    }

    #[test]
    fn env_filter_verbose_maps_to_debug_and_trace() {
        assert_eq!(env_filter(false, 1, "info").to_string(), "debug");
        assert_eq!(env_filter(false, 3, "info").to_string(), "trace");
    }

    #[test]
    fn path_override_wins() {
        let (_tmp, dir) = tmp_dir();
        let file = dir.join("nested/custom.jsonl");
        let target =
            resolve_log_target_with("demo", Some(file), Some(dir.join("other")), None).unwrap();
        assert_eq!(target.dir, dir.join("nested"));
        assert_eq!(target.file_name, "custom.jsonl");
    }

    #[test]
    fn env_dir_beats_config_dir() {
        let (_tmp, dir) = tmp_dir();
        let target = resolve_log_target_with(
            "demo",
            None,
            Some(dir.join("env")),
            Some(dir.join("config")),
        )
        .unwrap();
        assert_eq!(target.dir, dir.join("env"));
        assert_eq!(target.file_name, "demo.jsonl");
    }

    #[test]
    fn config_dir_is_used() {
        let (_tmp, dir) = tmp_dir();
        let target = resolve_log_target_with("demo", None, None, Some(dir.clone())).unwrap();
        assert_eq!(target.dir, dir);
        assert!(dir.join("demo.jsonl").is_file());
    }

    #[test]
    fn path_without_file_name_is_rejected() {
        assert!(log_target_from_path(Utf8Path::new("/")).is_err());
    }

    #[test]
    fn timestamp_shape() {
        let ts = format_timestamp();
        assert!(ts.ends_with('Z'), "{ts}");
        assert_eq!(ts.len(), 24, "{ts}");
        assert_eq!(&ts[10..11], "T");
    }

    #[test]
    fn civil_dates() {
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(19_782), (2024, 2, 29));
        assert_eq!(civil_from_days(-1), (1969, 12, 31));
    }
}
