use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How [`crate::Surface::load_code`] interprets its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Lang {
    /// Surface syntax, lowered to list-expressions and evaluated.
    #[default]
    Surface,
    /// Surface syntax compiled to native closures.
    Native,
    /// Pre-lowered list-expressions in wire JSON form.
    Sexpr,
    /// Surface syntax lowered by the self-hosted compiler.
    SelfHosted,
}

impl Lang {
    pub const ALL: [Lang; 4] = [Lang::Surface, Lang::Native, Lang::Sexpr, Lang::SelfHosted];

    pub fn name(self) -> &'static str {
        match self {
            Lang::Surface => "surface",
            Lang::Native => "native",
            Lang::Sexpr => "sexpr",
            Lang::SelfHosted => "self-hosted",
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Lang {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "surface" | "sprig" => Ok(Lang::Surface),
            "native" => Ok(Lang::Native),
            "sexpr" | "wire" => Ok(Lang::Sexpr),
            "self-hosted" | "selfhosted" => Ok(Lang::SelfHosted),
            other => Err(format!(
                "unknown language {other:?} (expected one of: surface, native, sexpr, self-hosted)"
            )),
        }
    }
}
