//! Application metadata and depot descriptors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ids::{AppId, DepotId, ManifestId};

/// Operating system a depot targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystem {
    Windows,
    MacOs,
    Linux,
}

impl FromStr for OperatingSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "windows" | "win" => Ok(Self::Windows),
            "macos" | "mac" | "osx" => Ok(Self::MacOs),
            "linux" => Ok(Self::Linux),
            other => Err(format!("unknown operating system '{other}'")),
        }
    }
}

impl fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Windows => "windows",
            Self::MacOs => "macos",
            Self::Linux => "linux",
        };
        f.write_str(s)
    }
}

/// CPU architecture a depot targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Architecture {
    #[serde(rename = "32")]
    X86,
    #[serde(rename = "64")]
    X64,
}

/// Kind of application, as reported by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppType {
    Game,
    Application,
    Tool,
    Demo,
    Dlc,
    Music,
    #[default]
    #[serde(other)]
    Unknown,
}

/// A depot descriptor as listed in an app's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Depot {
    pub id: DepotId,
    pub app_id: AppId,
    #[serde(default)]
    pub name: Option<String>,
    /// Empty means the depot applies to every OS.
    #[serde(default)]
    pub os_list: Vec<OperatingSystem>,
    #[serde(default)]
    pub architecture: Option<Architecture>,
    #[serde(default)]
    pub language: Option<String>,
    /// Current public manifest. Absent for depots that inherit from a base.
    #[serde(default)]
    pub manifest_id: Option<ManifestId>,
    /// Base depot for delta depots.
    #[serde(default)]
    pub base_depot_id: Option<DepotId>,
}

impl Depot {
    /// Create a depot with a manifest and no platform tags.
    pub const fn new(id: DepotId, app_id: AppId, manifest_id: ManifestId) -> Self {
        Self {
            id,
            app_id,
            name: None,
            os_list: Vec::new(),
            architecture: None,
            language: None,
            manifest_id: Some(manifest_id),
            base_depot_id: None,
        }
    }
}

/// Metadata for one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppMetadata {
    pub id: AppId,
    pub name: String,
    #[serde(default)]
    pub app_type: AppType,
    /// False for unreleased or removed apps, which have nothing to download.
    #[serde(default = "default_available")]
    pub is_available: bool,
    /// Depots in catalog order.
    #[serde(default)]
    pub depots: Vec<Depot>,
}

const fn default_available() -> bool {
    true
}

impl fmt::Display for AppMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Selects which depots of an app are relevant for this cache.
///
/// An empty OS list, or `None` for architecture/language, matches everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformFilter {
    pub operating_systems: Vec<OperatingSystem>,
    pub architecture: Option<Architecture>,
    pub language: Option<String>,
}

impl Default for PlatformFilter {
    /// Windows, 64-bit, English: what the official client downloads by default.
    fn default() -> Self {
        Self {
            operating_systems: vec![OperatingSystem::Windows],
            architecture: Some(Architecture::X64),
            language: Some("english".to_string()),
        }
    }
}

impl PlatformFilter {
    /// A filter that keeps every depot.
    pub const fn unfiltered() -> Self {
        Self {
            operating_systems: Vec::new(),
            architecture: None,
            language: None,
        }
    }

    /// Whether a depot passes this filter.
    ///
    /// Depot tags that are absent are treated as "applies everywhere".
    pub fn matches(&self, depot: &Depot) -> bool {
        let os_ok = self.operating_systems.is_empty()
            || depot.os_list.is_empty()
            || depot
                .os_list
                .iter()
                .any(|os| self.operating_systems.contains(os));

        let arch_ok = match (self.architecture, depot.architecture) {
            (Some(wanted), Some(actual)) => wanted == actual,
            _ => true,
        };

        let language_ok = match (&self.language, &depot.language) {
            (Some(wanted), Some(actual)) => wanted.eq_ignore_ascii_case(actual),
            _ => true,
        };

        os_ok && arch_ok && language_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depot(os: &[OperatingSystem], arch: Option<Architecture>, lang: Option<&str>) -> Depot {
        Depot {
            os_list: os.to_vec(),
            architecture: arch,
            language: lang.map(str::to_string),
            ..Depot::new(DepotId(1), AppId(1), ManifestId(1))
        }
    }

    #[test]
    fn untagged_depot_matches_any_filter() {
        let d = depot(&[], None, None);
        assert!(PlatformFilter::default().matches(&d));
        assert!(PlatformFilter::unfiltered().matches(&d));
    }

    #[test]
    fn default_filter_rejects_linux_only_depot() {
        let d = depot(&[OperatingSystem::Linux], None, None);
        assert!(!PlatformFilter::default().matches(&d));
        assert!(PlatformFilter::unfiltered().matches(&d));
    }

    #[test]
    fn architecture_and_language_must_agree_when_both_present() {
        let filter = PlatformFilter::default();
        assert!(!filter.matches(&depot(&[], Some(Architecture::X86), None)));
        assert!(filter.matches(&depot(&[], Some(Architecture::X64), Some("English"))));
        assert!(!filter.matches(&depot(&[], None, Some("german"))));
    }

    #[test]
    fn operating_system_parses_aliases() {
        assert_eq!("Win".parse::<OperatingSystem>().unwrap(), OperatingSystem::Windows);
        assert_eq!("osx".parse::<OperatingSystem>().unwrap(), OperatingSystem::MacOs);
        assert!("beos".parse::<OperatingSystem>().is_err());
    }

    #[test]
    fn app_metadata_defaults_when_fields_missing() {
        let app: AppMetadata = serde_json::from_str(r#"{"id": 440, "name": "TF2"}"#).unwrap();
        assert!(app.is_available);
        assert_eq!(app.app_type, AppType::Unknown);
        assert!(app.depots.is_empty());
    }
}
