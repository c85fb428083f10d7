use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    bson::{doc, Document},
    bson_util,
    error::{Error, Result},
    operation::{Aspect, Command, Operation},
};

/// The server's database profiling level.
///
/// The symbolic level is what callers see; the integer wire encoding (`0|1|2`) stays internal to
/// the operations below.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ProfilingLevel {
    /// Profiling is disabled.
    Off,

    /// Only slow operations are profiled.
    SlowOnly,

    /// All operations are profiled.
    All,
}

impl ProfilingLevel {
    pub(crate) fn as_wire_int(self) -> i32 {
        match self {
            ProfilingLevel::Off => 0,
            ProfilingLevel::SlowOnly => 1,
            ProfilingLevel::All => 2,
        }
    }

    pub(crate) fn from_wire_int(level: i64) -> Option<Self> {
        match level {
            0 => Some(ProfilingLevel::Off),
            1 => Some(ProfilingLevel::SlowOnly),
            2 => Some(ProfilingLevel::All),
            _ => None,
        }
    }

    /// The symbolic name of the level: `off`, `slow_only`, or `all`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfilingLevel::Off => "off",
            ProfilingLevel::SlowOnly => "slow_only",
            ProfilingLevel::All => "all",
        }
    }
}

impl FromStr for ProfilingLevel {
    type Err = Error;

    /// Parses a symbolic level name. An unrecognized name fails here, before any command can be
    /// built, let alone issued.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "off" => Ok(ProfilingLevel::Off),
            "slow_only" => Ok(ProfilingLevel::SlowOnly),
            "all" => Ok(ProfilingLevel::All),
            other => Err(Error::invalid_argument(format!(
                "invalid profiling level: {}",
                other
            ))),
        }
    }
}

/// Sets the database profiling level via `{profile: N}`. On success the caller gets the symbolic
/// level back, not the integer.
#[derive(Debug)]
pub(crate) struct SetProfilingLevel {
    db: String,
    level: ProfilingLevel,
}

impl SetProfilingLevel {
    pub(crate) fn new(db: impl Into<String>, level: ProfilingLevel) -> Self {
        Self {
            db: db.into(),
            level,
        }
    }
}

impl Operation for SetProfilingLevel {
    type O = ProfilingLevel;

    const NAME: &'static str = "profile";

    const ASPECTS: Aspect = Aspect::EXECUTE_WITH_SELECTION;

    fn build(&self) -> Result<Command> {
        let body = doc! { Self::NAME: self.level.as_wire_int() };
        Ok(Command::new(Self::NAME, self.db.clone(), body))
    }

    fn handle_response(&self, _response: Document) -> Result<Self::O> {
        Ok(self.level)
    }
}

/// Reads back the current profiling level via `{profile: -1}`.
#[derive(Debug)]
pub(crate) struct GetProfilingLevel {
    db: String,
}

impl GetProfilingLevel {
    pub(crate) fn new(db: impl Into<String>) -> Self {
        Self { db: db.into() }
    }
}

impl Operation for GetProfilingLevel {
    type O = ProfilingLevel;

    const NAME: &'static str = "profile";

    const ASPECTS: Aspect = Aspect::EXECUTE_WITH_SELECTION;

    fn build(&self) -> Result<Command> {
        Ok(Command::new(
            Self::NAME,
            self.db.clone(),
            doc! { Self::NAME: -1 },
        ))
    }

    fn handle_response(&self, response: Document) -> Result<Self::O> {
        response
            .get("was")
            .and_then(bson_util::get_int)
            .and_then(ProfilingLevel::from_wire_int)
            .ok_or_else(|| {
                Error::invalid_response(format!(
                    "no recognized profiling level in response: {}",
                    response
                ))
            })
    }
}
