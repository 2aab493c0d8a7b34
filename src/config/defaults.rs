//! Built-in variant table
//!
//! Used when the configuration file does not declare any `[[variant]]`.

use super::{ImageTypeConfig, VariantConfig};

const SD_CARD: &[(&str, &str)] = &[("mmc", "SD Card Image")];
const PPC: &[(&str, &str)] = &[("raw", "Raw Image"), ("boot_cd", "Boot CD")];
const SPARC: &[(&str, &str)] = &[("raw", "Raw Image")];
const ANYBOOT: &[(&str, &str)] = &[("anyboot", "Anyboot ISO")];

/// Variants built when nothing else is configured, in build order.
const BUILTIN_VARIANTS: &[(&str, &[(&str, &str)])] = &[
    ("arm", SD_CARD),
    ("m68k", ANYBOOT),
    ("ppc", PPC),
    ("riscv64", SD_CARD),
    ("sparc", SPARC),
    ("x86_64", ANYBOOT),
    ("x86_gcc2h", ANYBOOT),
];

/// Built-in variant configuration.
pub fn builtin_variants() -> Vec<VariantConfig> {
    BUILTIN_VARIANTS
        .iter()
        .map(|(name, types)| VariantConfig {
            name: name.to_string(),
            image_types: types
                .iter()
                .map(|(id, label)| ImageTypeConfig {
                    id: id.to_string(),
                    label: label.to_string(),
                })
                .collect(),
        })
        .collect()
}
