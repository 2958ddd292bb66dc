use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub hue: u16,
    pub saturation: u8,
    pub lightness: u8,
}

impl Hsl {
    pub const fn new(hue: u16, saturation: u8, lightness: u8) -> Self {
        Self {
            hue,
            saturation,
            lightness,
        }
    }

    /// Line colour of a visualisation with the given base hue.
    pub const fn base(hue: u16) -> Self {
        Self::new(hue % 360, 70, 45)
    }

    /// Paler tone used for the area under the line.
    pub const fn fill_variant(&self) -> Self {
        Self::new(self.hue, 85, 70)
    }

    pub fn css(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Hsl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hsl({}, {}%, {}%)",
            self.hue, self.saturation, self.lightness
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_strings_match_canvas_syntax() {
        let color = Hsl::base(140);
        assert_eq!(color.css(), "hsl(140, 70%, 45%)");
        assert_eq!(color.fill_variant().css(), "hsl(140, 85%, 70%)");
        assert_eq!(Hsl::base(400).hue, 40);
    }
}
