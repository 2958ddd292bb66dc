use sampleviz_core::render::ThemeColors;

const DARK_BACKGROUNDS: [&str; 2] = ["#1d2021", "#282828"];
const DARK_RGB_FRAGMENTS: [&str; 2] = ["40, 40, 40", "29, 32, 33"];

/// A `darkmode` class wins; otherwise a known dark background gives it away.
pub fn detect_dark(class_dark: bool, bg: &str) -> bool {
    if class_dark {
        return true;
    }
    let bg = bg.trim();
    DARK_BACKGROUNDS.contains(&bg) || DARK_RGB_FRAGMENTS.iter().any(|rgb| bg.contains(rgb))
}

/// Builds a palette from CSS custom properties; `lookup` returns the
/// computed value of a variable such as `--bg`.
pub fn palette_from_vars(lookup: impl Fn(&str) -> Option<String>, class_dark: bool) -> ThemeColors {
    let read = |name: &str| {
        lookup(name)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    };
    let bg = read("--bg");
    let is_dark = detect_dark(class_dark, bg.as_deref().unwrap_or(""));
    let fallback = ThemeColors::fallback(is_dark);

    ThemeColors {
        bg: bg.unwrap_or(fallback.bg),
        bg_h: read("--bg_h").unwrap_or(fallback.bg_h),
        fg: read("--fg").unwrap_or(fallback.fg),
        fg2: read("--fg4").unwrap_or(fallback.fg2),
        fg3: read("--fg3").unwrap_or(fallback.fg3),
        grid: read("--grid-color").unwrap_or(fallback.grid),
        is_dark,
        ..fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn dark_detection() {
        assert!(detect_dark(true, "#ffffff"));
        assert!(detect_dark(false, " #282828 "));
        assert!(detect_dark(false, "rgb(29, 32, 33)"));
        assert!(!detect_dark(false, "#fbf1c7"));
        assert!(!detect_dark(false, ""));
    }

    #[test]
    fn missing_variables_use_the_fallback_palette() {
        let palette = palette_from_vars(|_| None, false);
        assert_eq!(palette, ThemeColors::light());
        let dark = palette_from_vars(|_| Some("   ".into()), true);
        assert_eq!(dark, ThemeColors::dark());
    }

    #[test]
    fn variables_override_fallbacks() {
        let vars: HashMap<&str, &str> =
            [("--bg", "#1d2021"), ("--fg4", "#999"), ("--grid-color", "red")].into();
        let palette = palette_from_vars(|name| vars.get(name).map(|v| v.to_string()), false);
        assert!(palette.is_dark);
        assert_eq!(palette.bg, "#1d2021");
        assert_eq!(palette.fg2, "#999");
        assert_eq!(palette.grid, "red");
        assert_eq!(palette.fg, ThemeColors::dark().fg);
        assert_eq!(palette.threshold, ThemeColors::dark().threshold);
    }
}
