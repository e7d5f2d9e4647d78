use std::fmt;

/// The transform applied to each raw frame before display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    Grayscale,
    Blur,
    ColorDetect,
    Histogram,
}

impl Mode {
    pub const ALL: [Mode; 5] = [
        Mode::Normal,
        Mode::Grayscale,
        Mode::Blur,
        Mode::ColorDetect,
        Mode::Histogram,
    ];

    pub fn key(self) -> char {
        match self {
            Mode::Normal => 'n',
            Mode::Grayscale => 'g',
            Mode::Blur => 'b',
            Mode::ColorDetect => 'c',
            Mode::Histogram => 'h',
        }
    }

    pub fn from_key(key: char) -> Option<Mode> {
        Mode::ALL.into_iter().find(|mode| mode.key() == key)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Normal => "normal",
            Mode::Grayscale => "grayscale",
            Mode::Blur => "blur",
            Mode::ColorDetect => "color",
            Mode::Histogram => "histogram",
        };
        f.write_str(name)
    }
}

pub const QUIT_KEY: char = 'q';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Switch(Mode),
    Quit,
    Ignore,
}

impl KeyAction {
    /// Map a polled key code (already masked to its low byte) to an action.
    pub fn from_key_code(code: Option<i32>) -> KeyAction {
        let Some(key) = code
            .and_then(|code| u8::try_from(code).ok())
            .map(char::from)
        else {
            return KeyAction::Ignore;
        };
        if key == QUIT_KEY {
            return KeyAction::Quit;
        }
        Mode::from_key(key).map_or(KeyAction::Ignore, KeyAction::Switch)
    }
}
