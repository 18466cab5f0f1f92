use crate::emote::EmoteRecord;

const DEFAULT_SCALE: &str = "1.0";
const DEFAULT_THEME: &str = "light";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Static,
    Animated,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Static => "static",
            Format::Animated => "animated",
        }
    }
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Static => "png",
            Format::Animated => "gif",
        }
    }
    pub fn is_animated(&self) -> bool {
        matches!(self, Format::Animated)
    }
}

/// One concrete (format, scale, theme) combination of an emote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendition {
    pub format: Format,
    pub scale: String,
    pub theme: String,
}

impl Rendition {
    pub fn file_name(&self, id: &str) -> String {
        format!("{id}.{}", self.format.extension())
    }
}

pub trait SelectionPolicy {
    fn select(&self, record: &EmoteRecord) -> Rendition;
}

fn select_format(record: &EmoteRecord) -> Format {
    if record.format.iter().any(|f| f == "animated") {
        Format::Animated
    } else {
        Format::Static
    }
}

/// Used for channel emotes: the highest of the three well known scales,
/// the first listed theme.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChannelPolicy;

impl ChannelPolicy {
    const PREFERRED_SCALES: [&'static str; 3] = ["3.0", "2.0", "1.0"];
}

impl SelectionPolicy for ChannelPolicy {
    fn select(&self, record: &EmoteRecord) -> Rendition {
        let scale = Self::PREFERRED_SCALES
            .iter()
            .find(|desired| record.scale.iter().any(|s| s == *desired))
            .map(|s| s.to_string())
            .or_else(|| record.scale.first().cloned())
            .unwrap_or_else(|| DEFAULT_SCALE.to_string());
        let theme = record
            .theme_mode
            .first()
            .cloned()
            .unwrap_or_else(|| DEFAULT_THEME.to_string());

        Rendition {
            format: select_format(record),
            scale,
            theme,
        }
    }
}

/// Used for global emotes: the numerically largest scale, dark theme
/// whenever it is offered.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalPolicy;

impl SelectionPolicy for GlobalPolicy {
    fn select(&self, record: &EmoteRecord) -> Rendition {
        let scale = record
            .scale
            .iter()
            .filter_map(|s| Some((s.parse::<f64>().ok()?, s)))
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, s)| s.clone())
            .or_else(|| record.scale.first().cloned())
            .unwrap_or_else(|| DEFAULT_SCALE.to_string());
        let theme = if record.theme_mode.iter().any(|t| t == "dark") {
            "dark".to_string()
        } else {
            record
                .theme_mode
                .first()
                .cloned()
                .unwrap_or_else(|| DEFAULT_THEME.to_string())
        };

        Rendition {
            format: select_format(record),
            scale,
            theme,
        }
    }
}
