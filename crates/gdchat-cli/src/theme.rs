use ratatui::style::Color;

#[derive(Clone)]
pub struct Theme {
    pub name: &'static str,
    pub fg: Color,
    pub muted: Color,
    pub warning: Color,
    pub user_color: Color,
    pub bot_color: Color,
    pub system_color: Color,
    pub border: Color,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            name: "dark",
            fg: Color::Rgb(220, 220, 220),
            muted: Color::Rgb(100, 100, 100),
            warning: Color::Rgb(224, 175, 104),
            user_color: Color::Cyan,
            bot_color: Color::Green,
            system_color: Color::Yellow,
            border: Color::Rgb(60, 60, 60),
        }
    }

    pub fn light() -> Self {
        Self {
            name: "light",
            fg: Color::Rgb(40, 40, 40),
            muted: Color::Rgb(140, 140, 140),
            warning: Color::Rgb(176, 104, 0),
            user_color: Color::Blue,
            bot_color: Color::Rgb(0, 128, 64),
            system_color: Color::Rgb(160, 120, 0),
            border: Color::Rgb(180, 180, 180),
        }
    }

    pub fn by_name(name: &str) -> Self {
        match name {
            "light" => Self::light(),
            _ => Self::dark(),
        }
    }
}
