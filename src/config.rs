use std::path::PathBuf;

use crate::components::colors::{Rgb, hex_to_rgb};
use crate::error::Result;
use crate::ops::convert::ConvertOptions;
use crate::ops::render::RenderOptions;
use crate::{DEFAULT_BACKGROUND, DEFAULT_DRAW_COLOR, log_info, log_warn};

/// User-tunable defaults, persisted as a `key=value` text file.
#[derive(Clone, Debug, PartialEq)]
pub struct BoardSettings {
    /// Preview and thumbnail background.
    pub background: Rgb,
    /// Color a new editing session starts with.
    pub draw_color: Rgb,
    pub sharpen_amount: f32,
    pub intermediate_size: u32,
    pub alpha_threshold: u8,
    /// Output pixels per cell for rendered thumbnails.
    pub thumbnail_scale: u32,
    /// Maximum undo snapshots kept per session; 0 keeps everything.
    pub history_limit: usize,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            background: DEFAULT_BACKGROUND,
            draw_color: DEFAULT_DRAW_COLOR,
            sharpen_amount: 0.5,
            intermediate_size: 256,
            alpha_threshold: 10,
            thumbnail_scale: 1,
            history_limit: 0,
        }
    }
}

impl BoardSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/pixelboard/pixelboard_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\PixelBoard\pixelboard_settings.cfg
    /// On macOS:   ~/Library/Application Support/PixelBoard/pixelboard_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").ok()?;
            return Some(PathBuf::from(appdata).join("PixelBoard").join("pixelboard_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("PixelBoard")
                    .join("pixelboard_settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?;
            Some(config_dir.join("pixelboard").join("pixelboard_settings.cfg"))
        }
    }

    /// Parse settings text.  Unknown keys and bad values are ignored one by
    /// one, leaving the default in place.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            let ok = match key {
                "background" => hex_to_rgb(val).map(|c| s.background = c).is_ok(),
                "draw_color" => hex_to_rgb(val).map(|c| s.draw_color = c).is_ok(),
                "sharpen_amount" => match val.parse::<f32>() {
                    Ok(v) if v.is_finite() => {
                        s.sharpen_amount = v.clamp(0.0, 4.0);
                        true
                    }
                    _ => false,
                },
                "intermediate_size" => match val.parse::<u32>() {
                    Ok(v) if (1..=4096).contains(&v) => {
                        s.intermediate_size = v;
                        true
                    }
                    _ => false,
                },
                "alpha_threshold" => val.parse().map(|v| s.alpha_threshold = v).is_ok(),
                "thumbnail_scale" => match val.parse::<u32>() {
                    Ok(v) if (1..=64).contains(&v) => {
                        s.thumbnail_scale = v;
                        true
                    }
                    _ => false,
                },
                "history_limit" => val.parse().map(|v| s.history_limit = v).is_ok(),
                _ => true,
            };
            if !ok {
                log_warn!("Ignoring bad setting {}={}", key, val);
            }
        }
        s
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "background={}\n\
             draw_color={}\n\
             sharpen_amount={}\n\
             intermediate_size={}\n\
             alpha_threshold={}\n\
             thumbnail_scale={}\n\
             history_limit={}\n",
            self.background,
            self.draw_color,
            self.sharpen_amount,
            self.intermediate_size,
            self.alpha_threshold,
            self.thumbnail_scale,
            self.history_limit,
        )
    }

    /// Load settings from disk (returns default if file missing).
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        let Ok(content) = std::fs::read_to_string(&path) else { return Self::default() };
        log_info!("Loaded settings from {}", path.display());
        Self::parse(&content)
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::settings_path() else { return Ok(()) };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&path, self.to_config_string())?;
        Ok(())
    }

    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            intermediate_size: self.intermediate_size,
            sharpen_amount: self.sharpen_amount,
            alpha_threshold: self.alpha_threshold,
            background: self.background,
            ..ConvertOptions::default()
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions::default()
            .with_scale(self.thumbnail_scale)
            .with_background(self.background)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_text() {
        let s = BoardSettings {
            background: Rgb::new(1, 2, 3),
            draw_color: Rgb::new(200, 100, 50),
            sharpen_amount: 1.25,
            intermediate_size: 128,
            alpha_threshold: 0,
            thumbnail_scale: 8,
            history_limit: 50,
        };
        assert_eq!(BoardSettings::parse(&s.to_config_string()), s);
    }

    #[test]
    fn bad_lines_keep_defaults() {
        let s = BoardSettings::parse(
            "background=#zzzzzz\n\
             garbage line\n\
             unknown_key=1\n\
             thumbnail_scale=0\n\
             sharpen_amount=NaN\n\
             # comment=ignored\n\
             history_limit=20\n",
        );
        let d = BoardSettings::default();
        assert_eq!(s.background, d.background);
        assert_eq!(s.thumbnail_scale, d.thumbnail_scale);
        assert_eq!(s.sharpen_amount, d.sharpen_amount);
        assert_eq!(s.history_limit, 20);
    }

    #[test]
    fn options_follow_settings() {
        let mut s = BoardSettings::default();
        s.background = Rgb::new(9, 9, 9);
        s.thumbnail_scale = 4;
        s.alpha_threshold = 128;
        assert_eq!(s.render_options().scale, 4);
        assert_eq!(s.render_options().background, Rgb::new(9, 9, 9));
        assert_eq!(s.convert_options().alpha_threshold, 128);
        assert_eq!(s.convert_options().grid_cells, 64);
    }
}
