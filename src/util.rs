// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

use std::collections::HashMap;

pub fn select_custom_option<'a>(options: &'a HashMap<String, String>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| options.get(*key).map(|value| value.as_str()))
}

pub fn align_up(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_key_wins() {
        let mut options = HashMap::new();
        options.insert("x264.preset".to_string(), "slow".to_string());
        options.insert("preset".to_string(), "fast".to_string());
        assert_eq!(select_custom_option(&options, &["x264.preset", "preset"]), Some("slow"));
        assert_eq!(select_custom_option(&options, &["tune"]), None);
    }

    #[test]
    fn align_to_macroblock() {
        assert_eq!(align_up(0, 16), 0);
        assert_eq!(align_up(1, 16), 16);
        assert_eq!(align_up(320, 16), 320);
        assert_eq!(align_up(321, 16), 336);
    }
}
