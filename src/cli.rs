use crate::config::{ConfigOverrides, InterpolationConfig};
use crate::trace::TraceOptions;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

const USAGE: &str = "Supported flags: --config <path>, --ticks <n>, --tick-rate <hz>, --fps <hz>, --jitter <0..1>, \
--seed <n>, --deadband <f>, --delay <f>, --disable, --quiet.";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CliOverrides {
    config: Option<PathBuf>,
    ticks: Option<u32>,
    tick_rate: Option<f32>,
    fps: Option<f32>,
    jitter: Option<f32>,
    seed: Option<u64>,
    deadband: Option<f32>,
    delay: Option<f32>,
    disable: bool,
    quiet: bool,
}

impl CliOverrides {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = CliOverrides::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            let Some(key) = flag.strip_prefix("--") else {
                bail!("Unexpected argument '{flag}'. {USAGE}");
            };
            match key {
                "quiet" => {
                    overrides.quiet = true;
                    continue;
                }
                "disable" => {
                    overrides.disable = true;
                    continue;
                }
                _ => {}
            }
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "config" => overrides.config = Some(PathBuf::from(value)),
                "ticks" => overrides.ticks = Some(parse_value("ticks", &value)?),
                "tick-rate" => overrides.tick_rate = Some(parse_value("tick rate", &value)?),
                "fps" => overrides.fps = Some(parse_value("fps", &value)?),
                "jitter" => overrides.jitter = Some(parse_value("jitter", &value)?),
                "seed" => overrides.seed = Some(parse_value("seed", &value)?),
                "deadband" => overrides.deadband = Some(parse_value("deadband", &value)?),
                "delay" => overrides.delay = Some(parse_value("delay", &value)?),
                _ => bail!("Unknown flag '{flag}'. {USAGE}"),
            }
        }
        Ok(overrides)
    }

    pub fn quiet(&self) -> bool {
        self.quiet
    }

    pub fn config_overrides(&self) -> ConfigOverrides {
        ConfigOverrides { deadband: self.deadband, delay: self.delay, enabled: self.disable.then_some(false) }
    }

    /// Loads the config file if one was named, applies the overrides and fills the remaining trace
    /// settings from their defaults.
    pub fn into_trace_options(self) -> Result<TraceOptions> {
        let mut config = match &self.config {
            Some(path) => InterpolationConfig::load(path)?,
            None => InterpolationConfig::default(),
        };
        let overrides = self.config_overrides();
        if !overrides.is_empty() {
            log::info!("config overrides applied: {}", overrides.applied_fields().join(", "));
            config.apply_overrides(&overrides);
        }
        let defaults = TraceOptions::default();
        Ok(TraceOptions {
            config,
            ticks: self.ticks.unwrap_or(defaults.ticks),
            tick_rate: self.tick_rate.unwrap_or(defaults.tick_rate),
            fps: self.fps.unwrap_or(defaults.fps),
            jitter: self.jitter.unwrap_or(defaults.jitter),
            seed: self.seed.unwrap_or(defaults.seed),
            emit_reports: !self.quiet,
        })
    }
}

fn parse_value<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse::<T>().with_context(|| format!("Invalid {name} '{value}'"))
}
