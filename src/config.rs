use std::{env, sync::OnceLock};

use crate::{Error, Result};

/// Environment variable capping the worker threads of the engines.
pub const NUM_THREADS_ENV: &str = "SCIVAR_NUM_THREADS";

/// Thresholds deciding when transform and accumulate run in parallel.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Tuning {
    /// Accumulations with fewer input elements run serially.
    pub small_input: usize,
    /// Output chunks smaller than this accumulate into a private copy.
    pub false_sharing_volume: usize,
    /// Minimum outer extent at which an accumulation may chunk its output.
    pub chunking_limit: usize,
    /// Upper bound on partial results when chunking reduced outer dims.
    pub max_outer_chunks: usize,
    /// Transforms with fewer output elements run serially.
    pub transform_min_volume: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            small_input: 16384,
            false_sharing_volume: 128,
            chunking_limit: 65536,
            max_outer_chunks: 24,
            transform_min_volume: 32768,
        }
    }
}

impl Tuning {
    /// Never fans out.
    pub fn serial() -> Self {
        Self {
            small_input: usize::MAX,
            chunking_limit: usize::MAX,
            transform_min_volume: usize::MAX,
            ..Self::default()
        }
    }

    /// Fans out whenever the shape permits, regardless of size.
    pub fn eager() -> Self {
        Self {
            small_input: 0,
            chunking_limit: 0,
            transform_min_volume: 0,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Config {
    /// Size of the dedicated worker pool, `None` uses rayon's global pool.
    pub num_threads: Option<usize>,
    pub tuning: Tuning,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let num_threads = match env::var(NUM_THREADS_ENV) {
            Ok(v) => Some(parse_num_threads(&v)?),
            Err(env::VarError::NotPresent) => None,
            Err(e) => {
                return Err(Error::Range(format!("{}: {}", NUM_THREADS_ENV, e)));
            }
        };
        Ok(Self {
            num_threads,
            tuning: Tuning::default(),
        })
    }
}

fn parse_num_threads(s: &str) -> Result<usize> {
    match s.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(Error::Range(format!(
            "{} must be a positive integer, got {:?}",
            NUM_THREADS_ENV, s
        ))),
    }
}

/// Process-wide configuration, read from the environment on first use.
pub fn global() -> &'static Config {
    static CONFIG: OnceLock<Config> = OnceLock::new();
    CONFIG.get_or_init(|| {
        Config::from_env().unwrap_or_else(|e| {
            log::warn!("{}; falling back to defaults", e);
            Config::default()
        })
    })
}

#[cfg(test)]
mod tests {
    use super::{parse_num_threads, Tuning};
    use crate::Error;

    #[test]
    fn default_thresholds() {
        let t = Tuning::default();

        assert_eq!(t.small_input, 16384);
        assert_eq!(t.false_sharing_volume, 128);
        assert_eq!(t.chunking_limit, 65536);
        assert_eq!(t.max_outer_chunks, 24);
        assert!(Tuning::serial().transform_min_volume > t.transform_min_volume);
        assert_eq!(Tuning::eager().small_input, 0);
    }

    #[test]
    fn parse_threads() {
        assert_eq!(parse_num_threads(" 4 "), Ok(4));
        assert!(matches!(parse_num_threads("0"), Err(Error::Range(_))));
        assert!(matches!(parse_num_threads("many"), Err(Error::Range(_))));
    }
}
