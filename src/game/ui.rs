// UI-facing state. The controller writes it, the HUD reads it.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    Screws,
    Knife,
    Cut,
    Lift,
    Feed,
}

impl Hint {
    pub fn text(self) -> &'static str {
        match self {
            Hint::Screws => "Tap the golden screws to unscrew them. Drag to turn the oyster.",
            Hint::Knife => "Pick up the oyster knife, then tap the shell to pry it open.",
            Hint::Cut => "Hold and saw back and forth over the oyster to cut it free.",
            Hint::Lift => "Tap the oyster to lift it out of the shell.",
            Hint::Feed => "Drag the oyster to the pup!",
        }
    }
}

/// Pointer appearance requested by the current interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorHint {
    #[default]
    Default,
    Pointer,
    Grab,
    Grabbing,
    Copy,
    /// The 3D knife stands in for the cursor.
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UiState {
    /// Title card dismissed.
    pub started: bool,
    pub hint: Option<Hint>,
    pub sidebar_visible: bool,
    pub knife_selected: bool,
    pub cut_progress_percent: f32,
    /// Reveal message shown. Stays up for the rest of the session.
    pub overlay_visible: bool,
    pub cursor: CursorHint,
}
