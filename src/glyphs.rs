use crate::tui::Badge;
use ratatui::style::Color;
use serde::{Deserialize, Serialize};

/// Display prefix for an entry name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub icon: &'static str,
    pub color: Option<Color>,
}

impl Glyph {
    const fn plain(icon: &'static str) -> Self {
        Glyph { icon, color: None }
    }

    const fn colored(icon: &'static str, color: Color) -> Self {
        Glyph {
            icon,
            color: Some(color),
        }
    }
}

/// Maps an entry name to the glyph drawn in front of it, and action badges to
/// their labels. Pure: no filesystem access.
pub trait GlyphResolver {
    fn glyph(&self, name: &str, is_dir: bool) -> Glyph;
    fn badge_label(&self, badge: Badge) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconStyle {
    #[default]
    Nerd,
    Plain,
}

pub fn resolver_for(style: IconStyle) -> Box<dyn GlyphResolver> {
    match style {
        IconStyle::Nerd => Box::new(NerdFontGlyphs),
        IconStyle::Plain => Box::new(PlainGlyphs),
    }
}

fn extension(name: &str) -> Option<String> {
    let dot = name.rfind('.')?;
    if dot == 0 {
        return None;
    }
    Some(name[dot + 1..].to_lowercase())
}

/// Nerd Font icons; needs a patched font in the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NerdFontGlyphs;

impl NerdFontGlyphs {
    fn by_file_name(name: &str) -> Option<Glyph> {
        let glyph = match name {
            "Cargo.toml" | "Cargo.lock" => Glyph::colored("\u{e7a8} ", Color::Red),
            "Makefile" | "makefile" => Glyph::plain("\u{e779} "),
            "Dockerfile" => Glyph::colored("\u{f308} ", Color::Blue),
            ".gitignore" | ".gitattributes" | ".gitmodules" => {
                Glyph::colored("\u{f1d3} ", Color::Red)
            }
            "LICENSE" | "LICENSE.md" => Glyph::colored("\u{f0219} ", Color::Yellow),
            "README" | "README.md" => Glyph::colored("\u{f00ba} ", Color::Yellow),
            _ => return None,
        };
        Some(glyph)
    }

    fn by_extension(ext: &str) -> Option<Glyph> {
        let glyph = match ext {
            "txt" => Glyph::plain("\u{f15c} "),
            "jpg" | "jpeg" | "png" | "gif" | "svg" | "webp" => {
                Glyph::colored("\u{f1c5} ", Color::Magenta)
            }
            "doc" | "docx" => Glyph::colored("\u{f1c2} ", Color::Blue),
            "pdf" => Glyph::colored("\u{f1c1} ", Color::Red),
            "xls" | "xlsx" | "csv" => Glyph::colored("\u{f1c3} ", Color::Green),
            "ppt" | "pptx" => Glyph::colored("\u{f1c4} ", Color::Red),
            "mp3" | "flac" | "wav" | "ogg" => Glyph::plain("\u{f001} "),
            "mp4" | "mkv" | "webm" | "mov" => Glyph::plain("\u{f008} "),
            "zip" | "rar" | "tar" | "gz" | "7z" | "xz" | "zst" => {
                Glyph::colored("\u{f1c6} ", Color::Yellow)
            }
            "exe" | "bin" => Glyph::plain("\u{f013} "),
            "py" => Glyph::colored("\u{f2c8} ", Color::Yellow),
            "java" => Glyph::colored("\u{f17e} ", Color::Red),
            "html" | "htm" => Glyph::colored("\u{f13b} ", Color::Red),
            "css" => Glyph::colored("\u{f13c} ", Color::Blue),
            "js" | "mjs" => Glyph::colored("\u{f3b8} ", Color::Yellow),
            "json" => Glyph::colored("\u{f3c9} ", Color::Yellow),
            "rs" => Glyph::colored("\u{e7a8} ", Color::Red),
            "md" => Glyph::plain("\u{e609} "),
            "toml" | "yaml" | "yml" => Glyph::plain("\u{e615} "),
            "sh" | "bash" | "zsh" => Glyph::colored("\u{f489} ", Color::Green),
            _ => return None,
        };
        Some(glyph)
    }
}

impl GlyphResolver for NerdFontGlyphs {
    fn glyph(&self, name: &str, is_dir: bool) -> Glyph {
        if is_dir || name.ends_with('/') {
            return Glyph::colored("\u{f07b} ", Color::Blue);
        }
        if let Some(glyph) = Self::by_file_name(name) {
            return glyph;
        }
        extension(name)
            .and_then(|ext| Self::by_extension(&ext))
            .unwrap_or(Glyph::plain("\u{f016} "))
    }

    fn badge_label(&self, badge: Badge) -> &'static str {
        match badge {
            Badge::Copy => " \u{f0c5} copy ",
            Badge::Cut => " \u{f0190} cut ",
            Badge::Delete => " \u{f1f8} delete ",
            Badge::New => " \u{f067} new ",
            Badge::Renaming => " \u{f064f} renaming ",
        }
    }
}

/// ASCII fallback for terminals without Nerd Fonts.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainGlyphs;

impl GlyphResolver for PlainGlyphs {
    fn glyph(&self, name: &str, is_dir: bool) -> Glyph {
        if is_dir || name.ends_with('/') {
            Glyph::colored("+ ", Color::Blue)
        } else {
            Glyph::plain("- ")
        }
    }

    fn badge_label(&self, badge: Badge) -> &'static str {
        match badge {
            Badge::Copy => " [copy]",
            Badge::Cut => " [cut]",
            Badge::Delete => " [delete]",
            Badge::New => " [new]",
            Badge::Renaming => " [renaming]",
        }
    }
}
