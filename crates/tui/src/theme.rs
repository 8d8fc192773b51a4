use ratatui::style::Color;

pub struct Theme {
    pub border_focus: Color,
    pub border_inactive: Color,
    pub header_fg: Color,
    pub busy_fg: Color,
    pub error_fg: Color,
}

pub const THEME: Theme = Theme {
    border_focus: Color::Cyan,
    border_inactive: Color::DarkGray,
    header_fg: Color::Yellow,
    busy_fg: Color::Green,
    error_fg: Color::Red,
};
