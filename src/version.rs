//! Cask version values and `#{version…}` string interpolation.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpolationError {
    #[error("`#{{{placeholder}}}` needs a version but none is declared")]
    MissingVersion { placeholder: String },

    #[error("unknown version method `{method}` in `#{{{placeholder}}}`")]
    UnknownMethod { placeholder: String, method: String },

    #[error("unsupported interpolation `#{{{placeholder}}}`")]
    Unsupported { placeholder: String },

    #[error("unterminated interpolation in `{text}`")]
    Unterminated { text: String },
}

/// The value of a `version` stanza (`'1.2.3'`, or `latest` for `:latest`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    value: String,
}

impl Version {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    fn component(&self, index: usize) -> Option<&str> {
        self.value.split('.').nth(index).filter(|c| !c.is_empty())
    }

    fn components(&self, count: usize) -> Option<String> {
        let parts: Vec<&str> = self.value.split('.').take(count).collect();
        if parts.len() == count && parts.iter().all(|p| !p.is_empty()) {
            Some(parts.join("."))
        } else {
            None
        }
    }

    pub fn major(&self) -> Option<String> {
        self.component(0).map(str::to_string)
    }

    pub fn minor(&self) -> Option<String> {
        self.component(1).map(str::to_string)
    }

    pub fn patch(&self) -> Option<String> {
        self.component(2).map(str::to_string)
    }

    pub fn major_minor(&self) -> Option<String> {
        self.components(2)
    }

    pub fn major_minor_patch(&self) -> Option<String> {
        self.components(3)
    }

    pub fn before_comma(&self) -> Option<String> {
        self.value.split_once(',').map(|(before, _)| before.to_string())
    }

    pub fn after_comma(&self) -> Option<String> {
        self.value.split_once(',').map(|(_, after)| after.to_string())
    }

    pub fn before_colon(&self) -> Option<String> {
        self.value.split_once(':').map(|(before, _)| before.to_string())
    }

    pub fn after_colon(&self) -> Option<String> {
        self.value.split_once(':').map(|(_, after)| after.to_string())
    }

    pub fn no_dots(&self) -> String {
        self.value.replace('.', "")
    }

    pub fn dots_to_underscores(&self) -> String {
        self.value.replace('.', "_")
    }

    pub fn dots_to_hyphens(&self) -> String {
        self.value.replace('.', "-")
    }

    /// Applies one method. A method that does not match leaves the value as is;
    /// an unknown method yields `None`.
    pub fn apply(&self, method: &str) -> Option<Version> {
        let result = match method {
            "major" => self.major(),
            "minor" => self.minor(),
            "patch" => self.patch(),
            "major_minor" => self.major_minor(),
            "major_minor_patch" => self.major_minor_patch(),
            "before_comma" => self.before_comma(),
            "after_comma" => self.after_comma(),
            "before_colon" => self.before_colon(),
            "after_colon" => self.after_colon(),
            "no_dots" => Some(self.no_dots()),
            "dots_to_underscores" => Some(self.dots_to_underscores()),
            "dots_to_hyphens" => Some(self.dots_to_hyphens()),
            _ => return None,
        };
        Some(result.map(Version::new).unwrap_or_else(|| self.clone()))
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

/// Expands every `#{version}` / `#{version.method…}` placeholder in `text`.
pub fn interpolate(text: &str, version: Option<&Version>) -> Result<String, InterpolationError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find("#{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let close = matching_brace(after).ok_or_else(|| InterpolationError::Unterminated {
            text: text.to_string(),
        })?;
        let placeholder = after[..close].trim();
        out.push_str(&expand(placeholder, version)?);
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Like [`interpolate`], but leaves placeholders it cannot expand as written.
pub fn interpolate_known(text: &str, version: Option<&Version>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find("#{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = matching_brace(after) else {
            rest = &rest[open..];
            break;
        };
        match expand(after[..close].trim(), version) {
            Ok(expanded) => out.push_str(&expanded),
            Err(_) => out.push_str(&rest[open..open + 2 + close + 1]),
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

fn matching_brace(s: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn expand(placeholder: &str, version: Option<&Version>) -> Result<String, InterpolationError> {
    let mut parts = placeholder.split('.');
    if parts.next() != Some("version") {
        return Err(InterpolationError::Unsupported {
            placeholder: placeholder.to_string(),
        });
    }
    let mut current = version
        .cloned()
        .ok_or_else(|| InterpolationError::MissingVersion {
            placeholder: placeholder.to_string(),
        })?;
    for method in parts {
        current = current
            .apply(method)
            .ok_or_else(|| InterpolationError::UnknownMethod {
                placeholder: placeholder.to_string(),
                method: method.to_string(),
            })?;
    }
    Ok(current.value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn methods() {
        let v = Version::new("2.10.3");
        assert_eq!(v.major().as_deref(), Some("2"));
        assert_eq!(v.minor().as_deref(), Some("10"));
        assert_eq!(v.patch().as_deref(), Some("3"));
        assert_eq!(v.major_minor().as_deref(), Some("2.10"));
        assert_eq!(v.major_minor_patch().as_deref(), Some("2.10.3"));
        assert_eq!(v.no_dots(), "2103");
        assert_eq!(v.dots_to_underscores(), "2_10_3");
        assert_eq!(v.dots_to_hyphens(), "2-10-3");
    }

    #[test]
    fn comma_and_colon_parts() {
        let v = Version::new("1.2,345:abc");
        assert_eq!(v.before_comma().as_deref(), Some("1.2"));
        assert_eq!(v.after_comma().as_deref(), Some("345:abc"));
        assert_eq!(v.before_colon().as_deref(), Some("1.2,345"));
        assert_eq!(v.after_colon().as_deref(), Some("abc"));
    }

    #[test]
    fn non_matching_method_keeps_value() {
        let v = Version::new("2");
        assert_eq!(v.apply("minor"), Some(Version::new("2")));
        assert_eq!(v.apply("before_comma"), Some(Version::new("2")));
        assert_eq!(v.apply("frobnicate"), None);
    }

    #[test]
    fn interpolates_chained_methods() {
        let v = Version::new("1.2.3,456");
        assert_eq!(
            interpolate(
                "https://example.com/#{version.before_comma.major}/#{version.after_comma}/#{version}.xml",
                Some(&v)
            ),
            Ok("https://example.com/1/456/1.2.3,456.xml".to_string())
        );
    }

    #[test]
    fn plain_text_needs_no_version() {
        assert_eq!(
            interpolate("https://example.com/appcast.xml", None),
            Ok("https://example.com/appcast.xml".to_string())
        );
    }

    #[test]
    fn failures() {
        let v = Version::new("1.0");
        assert!(matches!(
            interpolate("#{version.major}", None),
            Err(InterpolationError::MissingVersion { .. })
        ));
        assert!(matches!(
            interpolate("#{version.csv.first}", Some(&v)),
            Err(InterpolationError::UnknownMethod { method, .. }) if method == "csv"
        ));
        assert!(matches!(
            interpolate("#{language}", Some(&v)),
            Err(InterpolationError::Unsupported { .. })
        ));
        assert!(matches!(
            interpolate("#{version", Some(&v)),
            Err(InterpolationError::Unterminated { .. })
        ));
    }

    #[test]
    fn known_placeholders_only() {
        let v = Version::new("1.2.3");
        assert_eq!(
            interpolate_known("#{appdir}/A #{version.major_minor}.app", Some(&v)),
            "#{appdir}/A 1.2.app"
        );
        assert_eq!(interpolate_known("#{version", Some(&v)), "#{version");
        assert_eq!(interpolate_known("v#{version}", None), "v#{version}");
    }
}
