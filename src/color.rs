// WHY: Fade display-colour arithmetic, triggered by the host alongside (not inside) a driver pass

use anyhow::{anyhow, bail, Result};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::classifier::{DIALOGUE_CLASS, NON_DIALOGUE_CLASS};
use crate::settings::FadeSettings;

/// Fraction of the way toward the background reached at intensity 100
pub const MAX_FADE: f32 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(0xFF, 0xFF, 0xFF);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB`, `RRGGBB` or the `#RGB` shorthand
    pub fn parse_hex(input: &str) -> Result<Self> {
        let hex = input.trim().trim_start_matches('#');
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            bail!("Invalid hex colour: {input}");
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|e| anyhow!("Invalid hex colour {input}: {e}"));
        match hex.len() {
            6 => Ok(Self::new(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
            3 => {
                let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Ok(Self::new(expand(0)?, expand(1)?, expand(2)?))
            }
            _ => bail!("Invalid hex colour length: {input}"),
        }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Linear mix toward `other`; `t` is clamped to 0..=1
    pub fn blend(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

impl FromStr for Rgb {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_hex(s)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Display colour for narration: `text` faded toward `background` by
/// `intensity` percent of [`MAX_FADE`]. Disabled fade returns `text`.
pub fn fade_color(enabled: bool, intensity: u32, text: Rgb, background: Rgb) -> Rgb {
    if !enabled {
        return text;
    }
    let t = intensity.min(100) as f32 / 100.0 * MAX_FADE;
    text.blend(background, t)
}

/// Resolved colours for the two style classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeStyle {
    pub dialogue: Rgb,
    pub narration: Rgb,
}

impl FadeStyle {
    pub fn from_settings(settings: &FadeSettings, text: Rgb, background: Rgb) -> Self {
        let dialogue = if settings.modify_dialogue_color {
            Rgb::parse_hex(&settings.dialogue_color).unwrap_or_else(|e| {
                warn!("{e}; using the default text colour for dialogue");
                text
            })
        } else {
            text
        };
        Self {
            dialogue,
            narration: fade_color(settings.fade_enabled, settings.fade_intensity, text, background),
        }
    }

    /// Style sheet for the two classes
    pub fn css(&self) -> String {
        format!(
            ".{DIALOGUE_CLASS} {{ color: {}; }}\n.{NON_DIALOGUE_CLASS} {{ color: {}; }}\n",
            self.dialogue, self.narration
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(Rgb::parse_hex("#FFFFFF").unwrap(), Rgb::WHITE);
        assert_eq!(Rgb::parse_hex("102030").unwrap(), Rgb::new(0x10, 0x20, 0x30));
        assert_eq!(Rgb::parse_hex("#fa0").unwrap(), Rgb::new(0xFF, 0xAA, 0x00));
        assert!(Rgb::parse_hex("#GGGGGG").is_err());
        assert!(Rgb::parse_hex("#12345").is_err());
        assert!("".parse::<Rgb>().is_err());
        assert_eq!(Rgb::new(1, 2, 255).to_string(), "#0102FF");
    }

    #[test]
    fn test_fade_bounds() {
        let text = Rgb::new(200, 200, 200);
        let bg = Rgb::BLACK;
        assert_eq!(fade_color(true, 0, text, bg), text);
        assert_eq!(fade_color(false, 100, text, bg), text);
        assert_eq!(fade_color(true, 100, text, bg), Rgb::new(50, 50, 50));
        // intensity above 100 is treated as 100
        assert_eq!(fade_color(true, 250, text, bg), fade_color(true, 100, text, bg));
    }

    #[test]
    fn test_style_from_settings() {
        let mut settings = FadeSettings::default();
        let text = Rgb::new(220, 221, 222);
        let style = FadeStyle::from_settings(&settings, text, Rgb::BLACK);
        assert_eq!(style.dialogue, text);
        assert_ne!(style.narration, text);

        settings.modify_dialogue_color = true;
        settings.dialogue_color = "#FF0000".to_string();
        let style = FadeStyle::from_settings(&settings, text, Rgb::BLACK);
        assert_eq!(style.dialogue, Rgb::new(255, 0, 0));

        settings.dialogue_color = "not a colour".to_string();
        let style = FadeStyle::from_settings(&settings, text, Rgb::BLACK);
        assert_eq!(style.dialogue, text);
        assert!(style.css().contains(".dialogue-text { color: #DCDDDE; }"));
    }
}
