//! Cores do aplicativo (hex), usadas pelo console para escolher os tons

pub const GRADIENT_START: &str = "#041C32";
pub const GRADIENT_END: &str = "#0D3B66";
pub const TEXT_PRIMARY: &str = "#FFF";
pub const TEXT_SECONDARY: &str = "#CCC";
pub const BUTTON_BACKGROUND: &str = "#F9A826";
pub const BUTTON_TEXT: &str = "#041C32";
pub const ICON_COLOR: &str = "#F9A826";
pub const SECONDARY: &str = "#F9A826";
pub const RED: &str = "#FF3B30";
pub const PRIMARY_LIGHT: &str = "rgba(255,255,255,0.1)";

/// Converte `#RGB` ou `#RRGGBB` em componentes
pub fn rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };
    let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb() {
        assert_eq!(rgb(BUTTON_BACKGROUND), Some((0xF9, 0xA8, 0x26)));
        assert_eq!(rgb(TEXT_PRIMARY), Some((255, 255, 255)));
        assert_eq!(rgb(PRIMARY_LIGHT), None);
    }
}
