pub const DEFAULT_PALETTE: [&str; 5] = ["#8B0000", "#0000FF", "#008000", "#FFFF00", "#FFA500"];

/// Markup colours and the one applied to the next committed annotation.
#[derive(Clone, Debug)]
pub struct Palette {
    colors: Vec<String>,
    selected: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(DEFAULT_PALETTE.iter().map(|color| color.to_string()).collect())
    }
}

impl Palette {
    /// An empty list falls back to the default palette.
    pub fn new(colors: Vec<String>) -> Self {
        let colors = if colors.is_empty() {
            DEFAULT_PALETTE.iter().map(|color| color.to_string()).collect()
        } else {
            colors
        };
        let selected = colors[0].clone();
        Self { colors, selected }
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    pub fn selected(&self) -> &str {
        &self.selected
    }

    /// Moves to the entry after the selected one, wrapping around. A colour
    /// outside the palette moves to the first entry.
    pub fn cycle(&mut self) -> &str {
        let next = self
            .colors
            .iter()
            .position(|color| color == &self.selected)
            .map_or(0, |index| (index + 1) % self.colors.len());
        self.selected = self.colors[next].clone();
        &self.selected
    }

    pub fn set(&mut self, color: impl Into<String>) {
        self.selected = color.into();
    }
}
