use image::Rgb;

const HEX_PALETTE: [u32; 20] = [
    0xFF3838, 0xFF9D97, 0xFF701F, 0xFFB21D, 0xCFD231, 0x48F90A, 0x92CC17, 0x3DDB86, 0x1A9334,
    0x00D4BB, 0x2C99A8, 0x00C2FF, 0x344593, 0x6473FF, 0x0018EC, 0x8438FF, 0x520085, 0xCB38FF,
    0xFF95C8, 0xFF37C7,
];

/// Box colour for a class id. Cycles through a fixed 20-colour palette.
pub fn class_color(class_id: usize) -> Rgb<u8> {
    let hex = HEX_PALETTE[class_id % HEX_PALETTE.len()];
    Rgb([(hex >> 16) as u8, (hex >> 8) as u8, hex as u8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_is_red() {
        assert_eq!(class_color(0), Rgb([0xFF, 0x38, 0x38]));
    }

    #[test]
    fn test_palette_wraps() {
        assert_eq!(class_color(20), class_color(0));
        assert_eq!(class_color(45), class_color(5));
    }

    #[test]
    fn test_adjacent_classes_differ() {
        for id in 0..19 {
            assert_ne!(class_color(id), class_color(id + 1));
        }
    }
}
