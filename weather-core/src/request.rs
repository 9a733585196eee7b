use std::fmt;

use thiserror::Error;

/// Language codes accepted by the upstream provider.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "ar", "bn", "bg", "zh", "cs", "da", "nl", "fi", "fr", "de", "el", "hi", "hu", "it", "ja", "jv",
    "ko", "zh_tw", "mr", "pl", "pt", "pa", "ro", "ru", "sr", "si", "sk", "es", "sv", "ta", "te",
    "tr", "uk", "ur", "vi", "en",
];

/// A caller supplied value that can never be sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self { field, reason: reason.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Scientific,
}

impl Units {
    /// Single-letter code the provider expects in the `units` query parameter.
    pub fn code(&self) -> &'static str {
        match self {
            Units::Metric => "m",
            Units::Imperial => "f",
            Units::Scientific => "s",
        }
    }

    pub const fn all() -> &'static [Units] {
        &[Units::Metric, Units::Imperial, Units::Scientific]
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Units {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "m" | "metric" => Ok(Units::Metric),
            "f" | "imperial" => Ok(Units::Imperial),
            "s" | "scientific" => Ok(Units::Scientific),
            _ => Err(ValidationError::new(
                "units",
                "Invalid units. Allowed values: m, f, s (metric, imperial, scientific)",
            )),
        }
    }
}

/// One of [`SUPPORTED_LANGUAGES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Language(&'static str);

impl Language {
    pub const ENGLISH: Language = Language("en");

    pub fn code(&self) -> &'static str {
        self.0
    }

    pub fn is_default(&self) -> bool {
        *self == Self::ENGLISH
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::ENGLISH
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl TryFrom<&str> for Language {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        SUPPORTED_LANGUAGES
            .iter()
            .find(|code| **code == value)
            .map(|code| Language(*code))
            .ok_or_else(|| {
                ValidationError::new(
                    "language",
                    format!(
                        "Invalid language. Allowed values: {}",
                        SUPPORTED_LANGUAGES.join(", ")
                    ),
                )
            })
    }
}

/// Validated query for current conditions at a location.
///
/// The location is passed to the provider verbatim; no trimming or geocoding happens here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WeatherRequest {
    location: String,
    units: Units,
    language: Language,
}

impl WeatherRequest {
    /// Build a request, applying defaults for absent units/language.
    pub fn build(
        location: impl Into<String>,
        units: Option<&str>,
        language: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let location = location.into();
        if location.is_empty() {
            return Err(ValidationError::new("location", "Location cannot be empty"));
        }

        let units = units.map(Units::try_from).transpose()?.unwrap_or_default();
        let language = language.map(Language::try_from).transpose()?.unwrap_or_default();

        Ok(Self { location, units, language })
    }

    /// Shortcut for a request with default units and language.
    pub fn for_location(location: impl Into<String>) -> Result<Self, ValidationError> {
        Self::build(location, None, None)
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn units(&self) -> Units {
        self.units
    }

    pub fn language(&self) -> Language {
        self.language
    }
}
