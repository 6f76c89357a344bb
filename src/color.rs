//! Color conversions for light entities: sRGB to CIE chromaticity,
//! correlated color temperature (CCT), and the mired scale the hub uses
//! for color temperature.

/// (red, green, blue), each 0-255.
pub type Rgb = (u8, u8, u8);

pub const BLACK: Rgb = (0, 0, 0);
pub const WHITE: Rgb = (255, 255, 255);

fn gamma_expand(channel: u8) -> f64 {
    let c = channel as f64 / 255.0;
    if c > 0.04045 {
        ((c + 0.055) / 1.055).powf(2.4)
    } else {
        c / 12.92
    }
}

/// sRGB to CIE 1931 XYZ (D65 reference white).
pub fn rgb_to_xyz(rgb: Rgb) -> (f64, f64, f64) {
    let r = gamma_expand(rgb.0);
    let g = gamma_expand(rgb.1);
    let b = gamma_expand(rgb.2);

    let x = r * 0.4124 + g * 0.3576 + b * 0.1805;
    let y = r * 0.2126 + g * 0.7152 + b * 0.0722;
    let z = r * 0.0193 + g * 0.1192 + b * 0.9505;
    (x * 100.0, y * 100.0, z * 100.0)
}

/// XYZ to xy chromaticity. Black (all zero) maps to (0, 0).
pub fn xyz_to_xy(xyz: (f64, f64, f64)) -> (f64, f64) {
    let sum = xyz.0 + xyz.1 + xyz.2;
    if sum == 0.0 {
        return (0.0, 0.0);
    }
    (xyz.0 / sum, xyz.1 / sum)
}

/// Approximate CCT in kelvin from xy chromaticity (McCamy's formula).
pub fn xy_to_cct(xy: (f64, f64)) -> u32 {
    let n = (xy.0 - 0.3320) / (0.1858 - xy.1);
    let cct = 449.0 * n.powi(3) + 3525.0 * n.powi(2) + 6823.3 * n + 5520.33;
    cct.max(0.0).round() as u32
}

/// Kelvin to mireds (micro reciprocal degrees).
pub fn cct_to_mireds(kelvin: u32) -> u16 {
    if kelvin == 0 {
        return 0;
    }
    (1_000_000.0 / kelvin as f64).round() as u16
}

/// Mireds back to kelvin.
pub fn mireds_to_cct(mireds: u16) -> u32 {
    if mireds == 0 {
        return 0;
    }
    (1_000_000.0 / mireds as f64).round() as u32
}

/// Approximate mireds for an RGB color; 0 for black.
pub fn rgb_to_mireds(rgb: Rgb) -> u16 {
    if rgb == BLACK {
        return 0;
    }
    cct_to_mireds(xy_to_cct(xyz_to_xy(rgb_to_xyz(rgb))))
}

/// Kelvin to an approximate RGB rendering (Tanner Helland's fit, valid
/// roughly 1000K-40000K).
pub fn cct_to_rgb(kelvin: u32) -> Rgb {
    let temp = kelvin as f64 / 100.0;

    let red = if temp <= 66.0 {
        255.0
    } else {
        329.698727446 * (temp - 60.0).powf(-0.1332047592)
    };

    let green = if temp <= 66.0 {
        99.4708025861 * temp.ln() - 161.1195681661
    } else {
        288.1221695283 * (temp - 60.0).powf(-0.0755148492)
    };

    let blue = if temp >= 66.0 {
        255.0
    } else if temp <= 19.0 {
        0.0
    } else {
        138.5177312231 * (temp - 10.0).ln() - 305.0447927307
    };

    (
        red.clamp(0.0, 255.0).round() as u8,
        green.clamp(0.0, 255.0).round() as u8,
        blue.clamp(0.0, 255.0).round() as u8,
    )
}

/// Perceived brightness as the simple channel average.
pub fn rgb_to_brightness(rgb: Rgb) -> u8 {
    ((rgb.0 as f64 + rgb.1 as f64 + rgb.2 as f64) / 3.0).round() as u8
}
