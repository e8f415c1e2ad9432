/// Parse a CSS color into (r, g, b, alpha). Accepts `#rgb`, `#rrggbb`,
/// `rgb(...)` and `rgba(...)`. Returns `None` for anything else.
pub fn parse_color(input: &str) -> Option<(u8, u8, u8, f64)> {
    let s = input.trim();

    if let Some(hex) = s.strip_prefix('#') {
        return match hex.len() {
            3 => {
                let mut channels = [0u8; 3];
                for (i, c) in hex.chars().enumerate() {
                    let nibble = c.to_digit(16)? as u8;
                    channels[i] = nibble << 4 | nibble;
                }
                Some((channels[0], channels[1], channels[2], 1.0))
            }
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                Some((r, g, b, 1.0))
            }
            _ => None,
        };
    }

    let lower = s.to_ascii_lowercase();
    if let Some(body) = lower
        .strip_prefix("rgba(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return None;
        }
        let (r, g, b) = parse_channels(&parts[..3])?;
        let a = parts[3].parse::<f64>().ok()?.clamp(0.0, 1.0);
        return Some((r, g, b, a));
    }
    if let Some(body) = lower
        .strip_prefix("rgb(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return None;
        }
        let (r, g, b) = parse_channels(&parts)?;
        return Some((r, g, b, 1.0));
    }

    None
}

fn parse_channels(parts: &[&str]) -> Option<(u8, u8, u8)> {
    let mut channels = [0u8; 3];
    for (i, part) in parts.iter().enumerate() {
        channels[i] = part.parse::<f64>().ok()?.clamp(0.0, 255.0).round() as u8;
    }
    Some((channels[0], channels[1], channels[2]))
}

pub fn rgb_css(r: u8, g: u8, b: u8) -> String {
    format!("rgb({r}, {g}, {b})")
}

pub fn rgba_css(r: u8, g: u8, b: u8, a: f64) -> String {
    let a = (a * 1000.0).round() / 1000.0;
    format!("rgba({r}, {g}, {b}, {a})")
}

/// Blend two CSS colors in HSL space (shortest hue path, linear alpha).
/// Returns `None` when either endpoint fails to parse.
pub fn mix_css(from: &str, to: &str, t: f64) -> Option<String> {
    let (fr, fg, fb, fa) = parse_color(from)?;
    let (tr, tg, tb, ta) = parse_color(to)?;

    let (h, s, l) = interpolate_hsl(rgb_to_hsl(fr, fg, fb), rgb_to_hsl(tr, tg, tb), t);
    let (r, g, b) = hsl_to_rgb(h, s, l);
    let a = fa + (ta - fa) * t;

    if (a - 1.0).abs() < f64::EPSILON {
        Some(rgb_css(r, g, b))
    } else {
        Some(rgba_css(r, g, b, a))
    }
}

/// Convert RGB to HSL. Returns (h: 0..360, s: 0..1, l: 0..1).
pub fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if (max - min).abs() < f64::EPSILON {
        return (0.0, 0.0, l);
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };

    let h = if (max - r).abs() < f64::EPSILON {
        let mut h = (g - b) / d;
        if g < b {
            h += 6.0;
        }
        h
    } else if (max - g).abs() < f64::EPSILON {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    (h * 60.0, s, l)
}

/// Convert HSL to RGB.
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    if s.abs() < f64::EPSILON {
        let v = (l * 255.0).round() as u8;
        return (v, v, v);
    }

    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l + s - l * s
    };
    let p = 2.0 * l - q;
    let h = h / 360.0;

    let r = hue_to_rgb(p, q, h + 1.0 / 3.0);
    let g = hue_to_rgb(p, q, h);
    let b = hue_to_rgb(p, q, h - 1.0 / 3.0);

    (
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    )
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

/// Interpolate between two HSL colors using shortest hue path.
pub fn interpolate_hsl(from: (f64, f64, f64), to: (f64, f64, f64), t: f64) -> (f64, f64, f64) {
    let mut dh = to.0 - from.0;
    if dh > 180.0 {
        dh -= 360.0;
    } else if dh < -180.0 {
        dh += 360.0;
    }

    let h = (from.0 + dh * t).rem_euclid(360.0);
    let s = from.1 + (to.1 - from.1) * t;
    let l = from.2 + (to.2 - from.2) * t;

    (h, s, l)
}
