//! Bit helpers over the 32-bit composite hash

pub type Bits = u32;

pub fn bit_is_set(value: Bits, position: usize) -> bool {
    position < 32 && value & (1 << position) != 0
}

pub fn set_bit(value: Bits, position: usize) -> Bits {
    value | (1 << position)
}

pub fn unset_bit(value: Bits, position: usize) -> Bits {
    value & !(1 << position)
}

/// Keeps the `count` low-order bits of `value`
pub fn lower_bits(value: Bits, count: u32) -> Bits {
    if count >= Bits::BITS {
        value
    } else {
        value & ((1 << count) - 1)
    }
}

/// Renders the value most significant bit first, grouped in bytes
pub fn bits_string(value: Bits) -> String {
    let mut out = String::with_capacity(35);
    for i in (0..32).rev() {
        out.push(if bit_is_set(value, i) { '1' } else { '0' });
        if i % 8 == 0 && i > 0 {
            out.push(' ');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_unset() {
        let v = set_bit(0, 3);
        assert_eq!(v, 8);
        assert!(bit_is_set(v, 3));
        assert!(!bit_is_set(v, 2));
        assert_eq!(unset_bit(v, 3), 0);
        assert!(bit_is_set(set_bit(0, 31), 31));
    }

    #[test]
    fn lower_bits_masks() {
        assert_eq!(lower_bits(0b1011_0110, 0), 0);
        assert_eq!(lower_bits(0b1011_0110, 3), 0b110);
        assert_eq!(lower_bits(u32::MAX, 32), u32::MAX);
    }

    #[test]
    fn bits_string_groups_bytes() {
        assert_eq!(
            bits_string(0x8000_0001),
            "10000000 00000000 00000000 00000001"
        );
    }
}
