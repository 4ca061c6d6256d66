//! Text conversion settings shared by every socket.

/// How socket values are rendered to and parsed from text.
///
/// # Example
///
/// ```rust
/// use vario_core::ConversionSettings;
///
/// let settings = ConversionSettings::default()
///     .with_nil_value("---")
///     .with_precision(2)
///     .with_preferred_units(["ft", "kt"]);
/// assert_eq!(settings.nil_value, "---");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSettings {
    /// Text that stands for a nil value, in both directions.
    pub nil_value: String,
    /// Text for boolean `true`.
    pub true_value: String,
    /// Text for boolean `false`.
    pub false_value: String,
    /// Digits after the decimal point for floating values. `None` prints the
    /// shortest representation that round-trips.
    pub precision: Option<usize>,
    /// Unit symbols to format quantities in, tried in order.
    pub preferred_units: Vec<String>,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            nil_value: "nil".to_string(),
            true_value: "true".to_string(),
            false_value: "false".to_string(),
            precision: None,
            preferred_units: Vec::new(),
        }
    }
}

impl ConversionSettings {
    /// Builder method to set the nil sentinel.
    pub fn with_nil_value(mut self, nil: impl Into<String>) -> Self {
        self.nil_value = nil.into();
        self
    }

    /// Builder method to set the boolean tokens.
    pub fn with_bool_values(mut self, true_value: impl Into<String>, false_value: impl Into<String>) -> Self {
        self.true_value = true_value.into();
        self.false_value = false_value.into();
        self
    }

    /// Builder method to set the floating-point precision.
    pub fn with_precision(mut self, digits: usize) -> Self {
        self.precision = Some(digits);
        self
    }

    /// Builder method to set the preferred units.
    pub fn with_preferred_units<I, S>(mut self, units: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferred_units = units.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if `text` is the nil sentinel.
    pub fn is_nil_text(&self, text: &str) -> bool {
        text.trim() == self.nil_value
    }
}

/// Formats a floating value honoring the configured precision.
pub(crate) fn format_float(value: f64, settings: &ConversionSettings) -> String {
    match settings.precision {
        Some(digits) => format!("{value:.digits$}"),
        None => value.to_string(),
    }
}
