//! Descriptive parsing of `MacOS.release <op> :name` predicates.
//!
//! Used for reporting only. Branch selection never depends on it.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MacOsRelease {
    Tiger,
    Leopard,
    SnowLeopard,
    Lion,
    MountainLion,
    Mavericks,
    Yosemite,
    ElCapitan,
    Sierra,
    HighSierra,
    Mojave,
    Catalina,
    BigSur,
    Monterey,
    Ventura,
    Sonoma,
    Sequoia,
}

impl MacOsRelease {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let release = match symbol {
            "tiger" => Self::Tiger,
            "leopard" => Self::Leopard,
            "snow_leopard" => Self::SnowLeopard,
            "lion" => Self::Lion,
            "mountain_lion" => Self::MountainLion,
            "mavericks" => Self::Mavericks,
            "yosemite" => Self::Yosemite,
            "el_capitan" => Self::ElCapitan,
            "sierra" => Self::Sierra,
            "high_sierra" => Self::HighSierra,
            "mojave" => Self::Mojave,
            "catalina" => Self::Catalina,
            "big_sur" => Self::BigSur,
            "monterey" => Self::Monterey,
            "ventura" => Self::Ventura,
            "sonoma" => Self::Sonoma,
            "sequoia" => Self::Sequoia,
            _ => return None,
        };
        Some(release)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Tiger => "Mac OS X Tiger",
            Self::Leopard => "Mac OS X Leopard",
            Self::SnowLeopard => "Mac OS X Snow Leopard",
            Self::Lion => "OS X Lion",
            Self::MountainLion => "OS X Mountain Lion",
            Self::Mavericks => "OS X Mavericks",
            Self::Yosemite => "OS X Yosemite",
            Self::ElCapitan => "OS X El Capitan",
            Self::Sierra => "macOS Sierra",
            Self::HighSierra => "macOS High Sierra",
            Self::Mojave => "macOS Mojave",
            Self::Catalina => "macOS Catalina",
            Self::BigSur => "macOS Big Sur",
            Self::Monterey => "macOS Monterey",
            Self::Ventura => "macOS Ventura",
            Self::Sonoma => "macOS Sonoma",
            Self::Sequoia => "macOS Sequoia",
        }
    }

    pub fn version(&self) -> &'static str {
        match self {
            Self::Tiger => "10.4",
            Self::Leopard => "10.5",
            Self::SnowLeopard => "10.6",
            Self::Lion => "10.7",
            Self::MountainLion => "10.8",
            Self::Mavericks => "10.9",
            Self::Yosemite => "10.10",
            Self::ElCapitan => "10.11",
            Self::Sierra => "10.12",
            Self::HighSierra => "10.13",
            Self::Mojave => "10.14",
            Self::Catalina => "10.15",
            Self::BigSur => "11",
            Self::Monterey => "12",
            Self::Ventura => "13",
            Self::Sonoma => "14",
            Self::Sequoia => "15",
        }
    }
}

impl std::fmt::Display for MacOsRelease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.version())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Comparison {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
}

impl Comparison {
    fn parse(op: &str) -> Option<Self> {
        let cmp = match op {
            "==" => Self::Eq,
            "!=" => Self::Ne,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            _ => return None,
        };
        Some(cmp)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// A recognized `MacOS.release|version <op> :release` predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MacOsConstraint {
    pub comparison: Comparison,
    pub release: MacOsRelease,
}

impl MacOsConstraint {
    /// Recognizes the predicate text. Anything else stays opaque (`None`).
    pub fn parse(predicate: &str) -> Option<Self> {
        let mut words = predicate.split_whitespace();
        let subject = words.next()?;
        if subject != "MacOS.release" && subject != "MacOS.version" {
            return None;
        }
        let comparison = Comparison::parse(words.next()?)?;
        let release = MacOsRelease::from_symbol(words.next()?.strip_prefix(':')?)?;
        if words.next().is_some() {
            return None;
        }
        Some(Self {
            comparison,
            release,
        })
    }
}

impl std::fmt::Display for MacOsConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "macOS {} {}", self.comparison.as_str(), self.release)
    }
}
