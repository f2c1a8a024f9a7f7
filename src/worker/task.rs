use std::fmt;
use serde::Serialize;

/// Kind of CPU-bound job handed to the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Decode,
    Encode,
    Archive,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Decode => "Decode",
            Self::Encode => "Encode",
            Self::Archive => "Archive",
        };
        f.write_str(name)
    }
}
