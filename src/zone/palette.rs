//! Opaque per-zone color/glyph palettes.
//!
//! These tables are consumed, not designed, by the deterministic
//! synthesizer: callers draw aesthetics from them but never curate or
//! extend their contents. Colors are each zone's full entry from the
//! source palette table; glyphs are the full concatenation of each zone's
//! assigned glyph categories (e.g. zone 1 is "jackals" + "sea" in full,
//! zone 4 is "jackals" + "deities" in full) rather than a truncated sample.

/// A zone's aesthetic source material: a bar of hex colors and a set of
/// glyph characters, both drawn from with replacement by the synthesizer.
pub struct ZonePalette {
    /// Hex color strings (e.g. `"#7489c9"`).
    pub colors: &'static [&'static str],
    /// Unicode glyph characters.
    pub glyphs: &'static [&'static str],
}

const ZONE_0: ZonePalette = ZonePalette {
    colors: &[
        "#7489c9", "#74c9c5", "#74bcc9", "#74abc9",
        "#749ac9", "#7489c9", "#7478c9", "#8174c9",
        "#9274c9", "#a374c9",
    ],
    glyphs: &[
        "ğ“„¿", "ğ“…€", "ğ“…±", "ğ“…·",
        "ğ“…¾", "ğ“…Ÿ", "ğ“…®", "ğ“…™",
        "ğ“…°", "ğ“…š", "ğ“…", "ğ“…ª",
        "ğ“…œ", "ğ“…›", "ğ“…˜", "ğ“…“",
        "ğ“…”", "ğ“…ƒ", "ğ“…‚",
    ],
};

const ZONE_1: ZonePalette = ZonePalette {
    colors: &[
        "#d74a49", "#183e4b", "#1a424f", "#294f5b",
        "#375c67", "#53737b", "#6f8a90", "#8ba0a4",
        "#bbc5c7", "#eaeaea",
    ],
    glyphs: &[
        "ğ“ƒ¢", "ğ“ƒ¦", "ğ“ƒ¥", "ğ“ƒ£",
        "ğ“¢", "ğ“ƒ¤", "ğ“ƒ§", "ğ“ƒ¨",
        "ğ“†›", "ğ“†œ", "ğ“†", "ğ“†",
        "ğ“†Ÿ", "ğ“†¡", "ğ“† ", "ğ“…»",
        "ğ“ˆ–", "ğ“†¢",
    ],
};

const ZONE_2: ZonePalette = ZonePalette {
    colors: &[
        "#c0decc", "#9ccbad", "#77b88f", "#53a675",
        "#34b768", "#4d9a6c", "#3ba364", "#478e64",
        "#3f905f", "#41825b",
    ],
    glyphs: &[
        "ğ“†ˆ", "ğ“†‰", "ğ“†Š", "ğ“†Œ",
        "ğ“†", "ğ“†‡", "ğ“†‘", "ğ“†“",
        "ğ“†—", "ğ“†™", "ğ“†š", "ğ“†˜",
        "ğ“†›", "ğ“†œ", "ğ“†", "ğ“†",
        "ğ“†Ÿ", "ğ“†¡", "ğ“† ", "ğ“…»",
        "ğ“ˆ–", "ğ“†¢",
    ],
};

const ZONE_3: ZonePalette = ZonePalette {
    colors: &[
        "#732ff6", "#7657eb", "#7972df", "#7e89d2",
        "#849dc4", "#8bb1b3", "#93c3a0", "#9cd488",
        "#a5e569", "#aff631",
    ],
    glyphs: &[
        "ğ“‡Œ", "ğ“†", "ğ“", "ğ“‡‹",
        "ğ“ƒ£", "ğ“š", "ğ“¢", "ğ“¤",
        "ğ“Œ¬", "ğ“†£", "ğ“†¥", "ğ“†",
        "ğ“†‹", "ğ“„‡", "ğ“ƒ•", "ğ“†‰",
        "ğ“…±",
    ],
};

const ZONE_4: ZonePalette = ZonePalette {
    colors: &[
        "#e6d1a8", "#e6cb92", "#e6c47c", "#e0ba6a",
        "#d7ae5b", "#cea34c", "#c5983c", "#ba8e32",
        "#ab8538", "#9c7c3c", "#8c6c30",
    ],
    glyphs: &[
        "ğ“ƒ¢", "ğ“ƒ¦", "ğ“ƒ¥", "ğ“ƒ£",
        "ğ“¢", "ğ“ƒ¤", "ğ“ƒ§", "ğ“ƒ¨",
        "ğ“›", "ğ“ ", "ğ“¦", "ğ“¥",
        "ğ“®", "ğ“­", "ğ“©", "ğ“³",
        "ğ“´", "ğ“§", "ğ“¨", "ğ“±",
        "ğ“£", "ğ“š", "ğ“«", "ğ“Ÿ",
        "ğ“¢", "ğ“µ", "ğ“œ", "ğ“‡´",
    ],
};

const PALETTES: &[ZonePalette] = &[ZONE_0, ZONE_1, ZONE_2, ZONE_3, ZONE_4];

/// Look up the palette registered for `zone`. Zones outside the embedded
/// table wrap modulo the table length so the synthesizer never fails
/// regardless of how many zones a deployment registers.
pub fn palette_for_zone(zone: i64) -> &'static ZonePalette {
    let len = PALETTES.len() as i64;
    let idx = zone.rem_euclid(len) as usize;
    &PALETTES[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_registered_zone_has_a_palette() {
        for z in 0..5 {
            let p = palette_for_zone(z);
            assert!(!p.colors.is_empty());
            assert!(!p.glyphs.is_empty());
        }
    }

    #[test]
    fn out_of_range_zone_wraps() {
        assert_eq!(
            palette_for_zone(5).colors.as_ptr(),
            palette_for_zone(0).colors.as_ptr()
        );
    }

    #[test]
    fn zone_4_colors_include_the_trailing_entry() {
        assert_eq!(palette_for_zone(4).colors.last(), Some(&"#8c6c30"));
    }

    #[test]
    fn zone_1_glyphs_combine_jackals_and_sea() {
        assert_eq!(palette_for_zone(1).glyphs.len(), 18);
    }

    #[test]
    fn zone_4_glyphs_combine_jackals_and_deities() {
        assert_eq!(palette_for_zone(4).glyphs.len(), 28);
    }
}
