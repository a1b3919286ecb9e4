//! Theme for human-mode output.

use console::Style;

/// Visual theme for dprof human-mode output.
///
/// Centralizes colors and styles for consistent rendering.
#[derive(Debug, Clone)]
pub struct DprofTheme {
    // Status colors
    pub accent: Style,
    pub success: Style,
    pub error: Style,
    pub warning: Style,
    pub muted: Style,

    // Component styles
    pub header: Style,
    pub label: Style,
    pub value: Style,
    pub snapshot_name: Style,
    pub fingerprint: Style,
    pub active: Style,
    pub inactive: Style,
}

impl Default for DprofTheme {
    fn default() -> Self {
        Self {
            accent: Style::new().blue(),
            success: Style::new().green().bold(),
            error: Style::new().red().bold(),
            warning: Style::new().yellow().bold(),
            muted: Style::new().dim(),
            header: Style::new().blue().bold(),
            label: Style::new().dim(),
            value: Style::new().bold(),
            snapshot_name: Style::new().cyan().bold(),
            fingerprint: Style::new().italic().dim(),
            active: Style::new().green(),
            inactive: Style::new().dim(),
        }
    }
}

impl DprofTheme {
    /// Theme with every style stripped.
    #[must_use]
    pub fn plain() -> Self {
        let plain = Style::new().force_styling(false);
        Self {
            accent: plain.clone(),
            success: plain.clone(),
            error: plain.clone(),
            warning: plain.clone(),
            muted: plain.clone(),
            header: plain.clone(),
            label: plain.clone(),
            value: plain.clone(),
            snapshot_name: plain.clone(),
            fingerprint: plain.clone(),
            active: plain.clone(),
            inactive: plain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_theme_has_no_escapes() {
        let theme = DprofTheme::plain();
        assert_eq!(theme.error.apply_to("boom").to_string(), "boom");
        assert_eq!(theme.snapshot_name.apply_to("desk").to_string(), "desk");
    }
}
