use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// File name of the manifest published at the root of every buildpack release.
pub const MANIFEST_FILE: &str = "manifest.yml";

/// A buildpack release discovered in the platform listing.
///
/// `name` is already normalised (underscores replaced by hyphens) so it can be
/// used directly as the repository segment of the manifest locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildpackIdentity {
    pub name: String,
    #[serde(rename = "version")]
    pub version_tag: String,
}

impl BuildpackIdentity {
    /// Builds an identity from the raw listing name, normalising it.
    pub fn new(raw_name: &str, version_tag: impl Into<String>) -> Self {
        Self {
            name: normalize_name(raw_name),
            version_tag: version_tag.into(),
        }
    }

    /// Locator of this release's manifest under `base_url`.
    ///
    /// ```
    /// use buildpack_eol::BuildpackIdentity;
    ///
    /// let id = BuildpackIdentity::new("ruby_buildpack", "v1.7.28");
    /// assert_eq!(
    ///     id.manifest_url("https://raw.githubusercontent.com/cloudfoundry"),
    ///     "https://raw.githubusercontent.com/cloudfoundry/ruby-buildpack/v1.7.28/manifest.yml"
    /// );
    /// ```
    pub fn manifest_url(&self, base_url: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            base_url.trim_end_matches('/'),
            self.name,
            self.version_tag,
            MANIFEST_FILE
        )
    }
}

impl fmt::Display for BuildpackIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version_tag)
    }
}

/// Replaces every underscore with a hyphen.
pub fn normalize_name(raw: &str) -> String {
    raw.replace('_', "-")
}

/// One `dependency_deprecation_dates` entry of a buildpack manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprecationRecord {
    /// ISO-8601 date; the only sort key.
    #[serde(default, deserialize_with = "scalar_text")]
    pub date: String,

    /// Dependency name (e.g. `ruby`, `bundler`)
    #[serde(default, deserialize_with = "scalar_text")]
    pub name: String,

    /// Version line the date applies to (e.g. `2.6.x`)
    #[serde(default, deserialize_with = "scalar_text")]
    pub version_line: String,

    /// Upstream end-of-life announcement, when the manifest provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// The projection of `manifest.yml` this tool cares about.
///
/// Every other manifest key is ignored. An absent or `null`
/// `dependency_deprecation_dates` decodes as an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildpackManifest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub dependency_deprecation_dates: Vec<DeprecationRecord>,
}

/// Deprecation records of one buildpack release, sorted by date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestResult {
    #[serde(flatten)]
    pub identity: BuildpackIdentity,
    #[serde(rename = "deprecations")]
    pub records: Vec<DeprecationRecord>,
}

impl ManifestResult {
    /// Takes ownership of `records` and sorts them by date.
    ///
    /// The sort is stable: entries sharing a date keep their manifest order.
    pub fn new(identity: BuildpackIdentity, mut records: Vec<DeprecationRecord>) -> Self {
        records.sort_by(|a, b| a.date.cmp(&b.date));
        Self { identity, records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// YAML types unquoted scalars (`3`, `true`), so accept any scalar and keep its text.
fn scalar_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::Null => Ok(String::new()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::String(s) => Ok(s),
        other => Err(D::Error::custom(format!(
            "expected a scalar value, found {:?}",
            other
        ))),
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, name: &str) -> DeprecationRecord {
        DeprecationRecord {
            date: date.to_string(),
            name: name.to_string(),
            version_line: "1.x".to_string(),
            link: None,
        }
    }

    #[test]
    fn test_identity_normalizes_underscores() {
        let id = BuildpackIdentity::new("dotnet_core_buildpack", "v2.3.4");
        assert_eq!(id.name, "dotnet-core-buildpack");
        assert_eq!(id.version_tag, "v2.3.4");
        assert!(!id.name.contains('_'));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let once = normalize_name("go_buildpack");
        assert_eq!(normalize_name(&once), once);
    }

    #[test]
    fn test_manifest_url_tolerates_trailing_slash() {
        let id = BuildpackIdentity::new("ruby_buildpack", "v1.7.28");
        assert_eq!(
            id.manifest_url("https://example.test/cloudfoundry/"),
            "https://example.test/cloudfoundry/ruby-buildpack/v1.7.28/manifest.yml"
        );
    }

    #[test]
    fn test_identity_display() {
        let id = BuildpackIdentity::new("php_buildpack", "v4.4.12");
        assert_eq!(id.to_string(), "php-buildpack v4.4.12");
    }

    #[test]
    fn test_manifest_result_sorts_by_date() {
        let id = BuildpackIdentity::new("ruby_buildpack", "v1.7.28");
        let result = ManifestResult::new(
            id,
            vec![record("2020-05-01", "ruby"), record("2019-11-01", "bundler")],
        );
        let dates: Vec<_> = result.records.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2019-11-01", "2020-05-01"]);
    }

    #[test]
    fn test_manifest_result_sort_is_stable() {
        let id = BuildpackIdentity::new("node_buildpack", "v1.6.0");
        let result = ManifestResult::new(
            id,
            vec![
                record("2021-01-01", "first"),
                record("2020-01-01", "early"),
                record("2021-01-01", "second"),
                record("2021-01-01", "third"),
            ],
        );
        let names: Vec<_> = result.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["early", "first", "second", "third"]);
    }

    #[test]
    fn test_record_serialization_omits_missing_link() {
        let json = serde_json::to_string(&record("2020-01-01", "ruby")).unwrap();
        assert!(!json.contains("link"));
        assert!(json.contains("\"version_line\":\"1.x\""));
    }

    #[test]
    fn test_manifest_result_json_shape() {
        let result = ManifestResult::new(
            BuildpackIdentity::new("go_buildpack", "v1.9.0"),
            vec![record("2020-01-01", "go")],
        );
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["name"], "go-buildpack");
        assert_eq!(value["version"], "v1.9.0");
        assert_eq!(value["deprecations"][0]["name"], "go");
    }
}
