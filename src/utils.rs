pub fn string_to_utf16(value: &str) -> Vec<u8> {
    value
        .encode_utf16()
        .flat_map(|i| i.to_le_bytes().to_vec())
        .collect::<Vec<u8>>()
}

pub fn string_to_oem(value: &str) -> Vec<u8> {
    // Characters outside the ASCII range have no portable OEM codepoint and
    // are replaced, the way lossy codepage conversions behave on Windows.
    value
        .chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{string_to_oem, string_to_utf16};

    #[test]
    fn test_string_to_utf16_is_little_endian_without_bom() {
        assert_eq!(
            string_to_utf16("User"),
            [0x55, 0x00, 0x73, 0x00, 0x65, 0x00, 0x72, 0x00]
        );
    }

    #[test]
    fn test_string_to_oem_replaces_non_ascii() {
        assert_eq!(string_to_oem("Dömain"), b"D?main");
    }
}
