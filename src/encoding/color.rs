use std::collections::{BTreeMap, HashMap};

use eframe::egui::Color32;

pub const GROUP_PALETTE: [Color32; 10] = [
    Color32::from_rgb(0x3B, 0x82, 0xF6),
    Color32::from_rgb(0x10, 0xB9, 0x81),
    Color32::from_rgb(0xF5, 0x9E, 0x0B),
    Color32::from_rgb(0x8B, 0x5C, 0xF6),
    Color32::from_rgb(0xEC, 0x48, 0x99),
    Color32::from_rgb(0x06, 0xB6, 0xD4),
    Color32::from_rgb(0xEF, 0x44, 0x44),
    Color32::from_rgb(0x84, 0xCC, 0x16),
    Color32::from_rgb(0xF4, 0x72, 0xB6),
    Color32::from_rgb(0x22, 0xD3, 0xEE),
];

pub const SEARCH_HIGHLIGHT: Color32 = Color32::from_rgb(0x3B, 0x82, 0xF6);
pub const DIMMED_NODE: Color32 = Color32::from_rgb(0x2A, 0x2A, 0x2A);

pub fn severity_color(severity: &str) -> Color32 {
    match severity {
        "Critical" => Color32::from_rgb(0xDC, 0x26, 0x26),
        "Major" => Color32::from_rgb(0xF9, 0x73, 0x16),
        "Minor" => Color32::from_rgb(0xFB, 0xBF, 0x24),
        "Warning" => Color32::from_rgb(0x3B, 0x82, 0xF6),
        _ => Color32::from_rgb(0xDC, 0x26, 0x26),
    }
}

/// Parses `#rgb`, `#rrggbb`, `#rrggbbaa` or `transparent`.
pub fn parse_color(value: &str) -> Option<Color32> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("transparent") {
        return Some(Color32::TRANSPARENT);
    }
    if value.starts_with('#') {
        Color32::from_hex(value).ok()
    } else {
        Color32::from_hex(&format!("#{value}")).ok()
    }
}

pub fn parse_color_or(value: Option<&str>, fallback: &str) -> Color32 {
    value
        .and_then(parse_color)
        .or_else(|| parse_color(fallback))
        .unwrap_or(Color32::GRAY)
}

/// Linear RGB interpolation with `t` clamped to `[0, 1]`.
pub fn interpolate(start: Color32, end: Color32, t: f32) -> Color32 {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    Color32::from_rgba_unmultiplied(
        lerp(start.r(), end.r()),
        lerp(start.g(), end.g()),
        lerp(start.b(), end.b()),
        lerp(start.a(), end.a()),
    )
}

pub fn with_alpha(color: Color32, alpha: u8) -> Color32 {
    let [r, g, b, _] = color.to_srgba_unmultiplied();
    Color32::from_rgba_unmultiplied(r, g, b, alpha)
}

/// `#rrggbb` without alpha; pair with [`opacity`]. Fully transparent is `none`.
pub fn to_css(color: Color32) -> String {
    if color.a() == 0 {
        return "none".to_owned();
    }
    let [r, g, b, _] = color.to_srgba_unmultiplied();
    format!("#{r:02x}{g:02x}{b:02x}")
}

pub fn opacity(color: Color32) -> f32 {
    color.a() as f32 / 255.0
}

/// Group colours assigned by first-seen order, with explicit overrides on top.
///
/// Indices are handed out once per session, so removing a group from view
/// never shifts the colour of the remaining groups. Reordering the roster of a
/// fresh dataset does change them unless an override map is supplied.
#[derive(Clone, Debug)]
pub struct GroupPalette {
    assigned: HashMap<String, Color32>,
    order: Vec<String>,
    overrides: HashMap<String, Color32>,
    default_color: Color32,
}

impl GroupPalette {
    pub fn new<I, S>(keys: I, default_color: Color32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut palette = Self {
            assigned: HashMap::new(),
            order: Vec::new(),
            overrides: HashMap::new(),
            default_color,
        };
        for key in keys {
            palette.observe(key.into());
        }
        palette
    }

    fn observe(&mut self, key: String) {
        if self.assigned.contains_key(&key) {
            return;
        }
        let color = GROUP_PALETTE[self.order.len() % GROUP_PALETTE.len()];
        self.assigned.insert(key.clone(), color);
        self.order.push(key);
    }

    /// Explicit colours win over the positional assignment. Entries that fail
    /// to parse are ignored.
    pub fn with_overrides<'a, I>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (key, value) in overrides {
            if let Some(color) = parse_color(value) {
                self.overrides.entry(key.to_owned()).or_insert(color);
            }
        }
        self
    }

    pub fn color_for(&self, key: &str) -> Color32 {
        self.overrides
            .get(key)
            .or_else(|| self.assigned.get(key))
            .copied()
            .unwrap_or(self.default_color)
    }

    pub fn color_for_known(&self, key: &str) -> Option<Color32> {
        self.overrides
            .get(key)
            .or_else(|| self.assigned.get(key))
            .copied()
    }

    pub fn keys(&self) -> &[String] {
        &self.order
    }
}

pub fn palette_overrides(map: &BTreeMap<String, String>) -> impl Iterator<Item = (&str, &str)> {
    map.iter().map(|(key, value)| (key.as_str(), value.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolate_clamps_t() {
        let black = Color32::from_rgb(0, 0, 0);
        let white = Color32::from_rgb(255, 255, 255);
        assert_eq!(interpolate(black, white, -3.0), black);
        assert_eq!(interpolate(black, white, 7.5), white);
        assert_eq!(interpolate(black, white, 0.5), Color32::from_rgb(128, 128, 128));
    }

    #[test]
    fn parses_hex_and_transparent() {
        assert_eq!(parse_color("#3B82F6"), Some(Color32::from_rgb(0x3B, 0x82, 0xF6)));
        assert_eq!(parse_color("10b981"), Some(Color32::from_rgb(0x10, 0xB9, 0x81)));
        assert_eq!(parse_color("transparent"), Some(Color32::TRANSPARENT));
        assert_eq!(parse_color("hsl(10, 50%, 50%)"), None);
        assert_eq!(
            parse_color_or(Some("garbage"), "#000000"),
            Color32::from_rgb(0, 0, 0)
        );
    }

    #[test]
    fn palette_wraps_by_first_seen_order() {
        let keys = (0..12).map(|index| format!("g{index}"));
        let palette = GroupPalette::new(keys, Color32::GRAY);
        assert_eq!(palette.color_for("g0"), GROUP_PALETTE[0]);
        assert_eq!(palette.color_for("g3"), GROUP_PALETTE[3]);
        assert_eq!(palette.color_for("g10"), GROUP_PALETTE[0]);
        assert_eq!(palette.color_for("g11"), GROUP_PALETTE[1]);
        assert_eq!(palette.color_for("unknown"), Color32::GRAY);
    }

    #[test]
    fn palette_overrides_win_and_duplicates_keep_first_slot() {
        let palette = GroupPalette::new(["a", "b", "a", "c"], Color32::GRAY)
            .with_overrides([("b", "#000000"), ("c", "not-a-color")]);
        assert_eq!(palette.keys(), ["a", "b", "c"]);
        assert_eq!(palette.color_for("a"), GROUP_PALETTE[0]);
        assert_eq!(palette.color_for("b"), Color32::from_rgb(0, 0, 0));
        assert_eq!(palette.color_for("c"), GROUP_PALETTE[2]);
    }
}
