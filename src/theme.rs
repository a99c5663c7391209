use ratatui::style::{Color, Modifier, Style};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ThemeMode {
    Light,
    Dark,
}

#[derive(Clone, Debug)]
pub struct Theme {
    #[allow(dead_code)]
    pub mode: ThemeMode,
    pub bg: Color,
    pub fg: Color,
    #[allow(dead_code)]
    pub primary: Color,
    #[allow(dead_code)]
    pub secondary: Color,
    pub accent: Color,
    pub frame: Color,
    pub selected: Color,
    pub success: Color,
    pub error: Color,
    pub muted: Color,
}

impl Theme {
    pub fn midnight() -> Self {
        Self {
            mode: ThemeMode::Dark,
            bg: Color::Rgb(18, 20, 24),
            fg: Color::White,
            primary: Color::Rgb(220, 60, 90),
            secondary: Color::Rgb(80, 220, 190),
            accent: Color::Rgb(90, 160, 255),
            frame: Color::Rgb(90, 90, 100),
            selected: Color::Rgb(255, 170, 40),
            success: Color::Green,
            error: Color::Red,
            muted: Color::DarkGray,
        }
    }

    pub fn paper() -> Self {
        Self {
            mode: ThemeMode::Light,
            bg: Color::Rgb(246, 244, 240),
            fg: Color::Rgb(22, 22, 26),
            primary: Color::Rgb(180, 40, 70),
            secondary: Color::Rgb(0, 150, 130),
            accent: Color::Rgb(40, 110, 220),
            frame: Color::Rgb(200, 200, 210),
            selected: Color::Rgb(210, 120, 0),
            success: Color::Rgb(0, 150, 0),
            error: Color::Rgb(200, 0, 0),
            muted: Color::Rgb(120, 120, 130),
        }
    }

    pub fn from_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Dark => Self::midnight(),
            ThemeMode::Light => Self::paper(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::midnight()
    }
}

// Style helpers that use the theme
impl Theme {
    pub fn border_focused(&self) -> Style {
        Style::default().fg(self.selected)
    }

    pub fn border_unfocused(&self) -> Style {
        Style::default().fg(self.frame)
    }

    pub fn text_active_bold(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text_muted(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn text_error(&self) -> Style {
        Style::default().fg(self.error)
    }

    pub fn text_success(&self) -> Style {
        Style::default().fg(self.success)
    }

    pub fn list_cursor_style(&self) -> Style {
        Style::default()
            .fg(self.bg)
            .bg(self.selected)
            .add_modifier(Modifier::BOLD)
    }

    pub fn panel_style(&self, active: bool) -> Style {
        let border_color = if active { self.selected } else { self.frame };
        Style::default().fg(border_color)
    }

    pub fn title_style(&self) -> Style {
        Style::default().fg(self.accent)
    }

    pub fn base_style(&self) -> Style {
        Style::default().bg(self.bg).fg(self.fg)
    }

    pub fn toast_color(&self, level: crate::ui::ToastLevel) -> Color {
        match level {
            crate::ui::ToastLevel::Success => self.success,
            crate::ui::ToastLevel::Error => self.error,
            crate::ui::ToastLevel::Info => self.accent,
        }
    }
}
