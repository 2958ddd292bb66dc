/// DOM ids of one visual, all derived from a shared base id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementIds {
    pub canvas: String,
    pub step: String,
    pub run: String,
    pub reset: String,
    pub count: String,
    pub sides: String,
    pub log_x: String,
    pub log_y: String,
    pub info: String,
}

impl ElementIds {
    pub fn for_base(base: &str) -> Self {
        let id = |suffix: &str| format!("{base}{suffix}");
        Self {
            canvas: id("Canvas"),
            step: id("Step"),
            run: id("Run"),
            reset: id("Reset"),
            count: id("Count"),
            sides: id("Sides"),
            log_x: id("LogX"),
            log_y: id("LogY"),
            info: id("Info"),
        }
    }
}

/// Value of a count input; blank or non-positive input is ignored.
pub fn parse_count(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok().filter(|count| *count > 0)
}

/// Value of a sides select: `Some(None)` means plain uniform draws.
pub fn parse_sides(value: &str) -> Option<Option<u32>> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("none") || value.eq_ignore_ascii_case("u") {
        return Some(None);
    }
    let sides = value.trim_start_matches(['d', 'D']).parse::<u32>().ok()?;
    (sides > 0).then_some(Some(sides))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_follow_the_base() {
        let ids = ElementIds::for_base("clt");
        assert_eq!(ids.canvas, "cltCanvas");
        assert_eq!(ids.step, "cltStep");
        assert_eq!(ids.log_x, "cltLogX");
        assert_eq!(ids.info, "cltInfo");
    }

    #[test]
    fn count_input_rejects_garbage() {
        assert_eq!(parse_count(" 12 "), Some(12));
        assert_eq!(parse_count("0"), None);
        assert_eq!(parse_count("-3"), None);
        assert_eq!(parse_count(""), None);
    }

    #[test]
    fn sides_select_values() {
        assert_eq!(parse_sides("6"), Some(Some(6)));
        assert_eq!(parse_sides("d20"), Some(Some(20)));
        assert_eq!(parse_sides("none"), Some(None));
        assert_eq!(parse_sides(""), Some(None));
        assert_eq!(parse_sides("0"), None);
        assert_eq!(parse_sides("six"), None);
    }
}
