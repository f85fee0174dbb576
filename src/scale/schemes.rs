//! Named color schemes.
//!
//! Continuous schemes are ramps of evenly spaced stops (9 for sequential,
//! 11 for diverging, following the ColorBrewer and matplotlib tables);
//! categorical schemes are finite palettes. Lookups are case-insensitive.

#![allow(clippy::unreadable_literal)]

use super::ScaleType;

/// Default sequential interpolator.
pub const DEFAULT_SEQUENTIAL: &str = "viridis";
/// Default diverging interpolator.
pub const DEFAULT_DIVERGING: &str = "RdBu";
/// Default categorical palette.
pub const DEFAULT_CATEGORICAL: &str = "tableau10";

const SEQUENTIAL: &[(&str, &[u32])] = &[
    ("viridis", &[0x440154, 0x472d7b, 0x3b528b, 0x2c728e, 0x21918c, 0x28ae80, 0x5ec962, 0xaddc30, 0xfde725]),
    ("magma", &[0x000004, 0x1c1044, 0x4f127b, 0x812581, 0xb5367a, 0xe55964, 0xfb8761, 0xfec287, 0xfcfdbf]),
    ("inferno", &[0x000004, 0x1f0c48, 0x550f6d, 0x88226a, 0xba3655, 0xe35933, 0xf98e09, 0xf8c931, 0xfcffa4]),
    ("plasma", &[0x0d0887, 0x4c02a1, 0x7e03a8, 0xa92395, 0xcc4778, 0xe56b5d, 0xf89540, 0xfdc527, 0xf0f921]),
    ("cividis", &[0x00224e, 0x123570, 0x3b496c, 0x575d6d, 0x707173, 0x8a8678, 0xa59c74, 0xc3b369, 0xfee838]),
    ("turbo", &[0x30123b, 0x4662d7, 0x36aaf9, 0x1ae4b6, 0x72fe5e, 0xc8ef34, 0xfaba39, 0xf66b19, 0xca2a04, 0x7a0403]),
    ("blues", &[0xf7fbff, 0xdeebf7, 0xc6dbef, 0x9ecae1, 0x6baed6, 0x4292c6, 0x2171b5, 0x08519c, 0x08306b]),
    ("greens", &[0xf7fcf5, 0xe5f5e0, 0xc7e9c0, 0xa1d99b, 0x74c476, 0x41ab5d, 0x238b45, 0x006d2c, 0x00441b]),
    ("greys", &[0xffffff, 0xf0f0f0, 0xd9d9d9, 0xbdbdbd, 0x969696, 0x737373, 0x525252, 0x252525, 0x000000]),
    ("oranges", &[0xfff5eb, 0xfee6ce, 0xfdd0a2, 0xfdae6b, 0xfd8d3c, 0xf16913, 0xd94801, 0xa63603, 0x7f2704]),
    ("purples", &[0xfcfbfd, 0xefedf5, 0xdadaeb, 0xbcbddc, 0x9e9ac8, 0x807dba, 0x6a51a3, 0x54278f, 0x3f007d]),
    ("reds", &[0xfff5f0, 0xfee0d2, 0xfcbba1, 0xfc9272, 0xfb6a4a, 0xef3b2c, 0xcb181d, 0xa50f15, 0x67000d]),
    ("YlOrRd", &[0xffffcc, 0xffeda0, 0xfed976, 0xfeb24c, 0xfd8d3c, 0xfc4e2a, 0xe31a1c, 0xbd0026, 0x800026]),
    ("YlGnBu", &[0xffffd9, 0xedf8b1, 0xc7e9b4, 0x7fcdbb, 0x41b6c4, 0x1d91c0, 0x225ea8, 0x253494, 0x081d58]),
    ("YlGn", &[0xffffe5, 0xf7fcb9, 0xd9f0a3, 0xaddd8e, 0x78c679, 0x41ab5d, 0x238443, 0x006837, 0x004529]),
    ("BuPu", &[0xf7fcfd, 0xe0ecf4, 0xbfd3e6, 0x9ebcda, 0x8c96c6, 0x8c6bb1, 0x88419d, 0x810f7c, 0x4d004b]),
    ("OrRd", &[0xfff7ec, 0xfee8c8, 0xfdd49e, 0xfdbb84, 0xfc8d59, 0xef6548, 0xd7301f, 0xb30000, 0x7f0000]),
    ("PuRd", &[0xf7f4f9, 0xe7e1ef, 0xd4b9da, 0xc994c7, 0xdf65b0, 0xe7298a, 0xce1256, 0x980043, 0x67001f]),
    ("BuGn", &[0xf7fcfd, 0xe5f5f9, 0xccece6, 0x99d8c9, 0x66c2a4, 0x41ae76, 0x238b45, 0x006d2c, 0x00441b]),
    ("GnBu", &[0xf7fcf0, 0xe0f3db, 0xccebc5, 0xa8ddb5, 0x7bccc4, 0x4eb3d3, 0x2b8cbe, 0x0868ac, 0x084081]),
    ("PuBuGn", &[0xfff7fb, 0xece2f0, 0xd0d1e6, 0xa6bddb, 0x67a9cf, 0x3690c0, 0x02818a, 0x016c59, 0x014636]),
    ("PuBu", &[0xfff7fb, 0xece7f2, 0xd0d1e6, 0xa6bddb, 0x74a9cf, 0x3690c0, 0x0570b0, 0x045a8d, 0x023858]),
    ("RdPu", &[0xfff7f3, 0xfde0dd, 0xfcc5c0, 0xfa9fb5, 0xf768a1, 0xdd3497, 0xae017e, 0x7a0177, 0x49006a]),
    ("YlOrBr", &[0xffffe5, 0xfff7bc, 0xfee391, 0xfec44f, 0xfe9929, 0xec7014, 0xcc4c02, 0x993404, 0x662506]),
    ("warm", &[0x6e40aa, 0xa03db3, 0xd23ea7, 0xf9478e, 0xff5e63, 0xff7d45, 0xf0a334, 0xd4c83b, 0xaff05b]),
    ("cool", &[0x6e40aa, 0x5b5ad0, 0x417de0, 0x2aa1dc, 0x1ac7c2, 0x1ddfa3, 0x30ef82, 0x52f667, 0xaff05b]),
    ("CubehelixDefault", &[0x000000, 0x1a1530, 0x163d4e, 0x1f6642, 0x54792f, 0xa07949, 0xd07e93, 0xcf9cda, 0xc1caf3, 0xd2eeef, 0xffffff]),
];

const DIVERGING: &[(&str, &[u32])] = &[
    ("RdBu", &[0x67001f, 0xb2182b, 0xd6604d, 0xf4a582, 0xfddbc7, 0xf7f7f7, 0xd1e5f0, 0x92c5de, 0x4393c3, 0x2166ac, 0x053061]),
    ("BrBG", &[0x543005, 0x8c510a, 0xbf812d, 0xdfc27d, 0xf6e8c3, 0xf5f5f5, 0xc7eae5, 0x80cdc1, 0x35978f, 0x01665e, 0x003c30]),
    ("PRGn", &[0x40004b, 0x762a83, 0x9970ab, 0xc2a5cf, 0xe7d4e8, 0xf7f7f7, 0xd9f0d3, 0xa6dba0, 0x5aae61, 0x1b7837, 0x00441b]),
    ("PiYG", &[0x8e0152, 0xc51b7d, 0xde77ae, 0xf1b6da, 0xfde0ef, 0xf7f7f7, 0xe6f5d0, 0xb8e186, 0x7fbc41, 0x4d9221, 0x276419]),
    ("PuOr", &[0x7f3b08, 0xb35806, 0xe08214, 0xfdb863, 0xfee0b6, 0xf7f7f7, 0xd8daeb, 0xb2abd2, 0x8073ac, 0x542788, 0x2d004b]),
    ("RdGy", &[0x67001f, 0xb2182b, 0xd6604d, 0xf4a582, 0xfddbc7, 0xffffff, 0xe0e0e0, 0xbababa, 0x878787, 0x4d4d4d, 0x1a1a1a]),
    ("RdYlBu", &[0xa50026, 0xd73027, 0xf46d43, 0xfdae61, 0xfee090, 0xffffbf, 0xe0f3f8, 0xabd9e9, 0x74add1, 0x4575b4, 0x313695]),
    ("RdYlGn", &[0xa50026, 0xd73027, 0xf46d43, 0xfdae61, 0xfee08b, 0xffffbf, 0xd9ef8b, 0xa6d96a, 0x66bd63, 0x1a9850, 0x006837]),
    ("Spectral", &[0x9e0142, 0xd53e4f, 0xf46d43, 0xfdae61, 0xfee08b, 0xffffbf, 0xe6f598, 0xabdda4, 0x66c2a5, 0x3288bd, 0x5e4fa2]),
];

const CATEGORICAL: &[(&str, &[u32])] = &[
    ("tableau10", &[0x4e79a7, 0xf28e2c, 0xe15759, 0x76b7b2, 0x59a14f, 0xedc949, 0xaf7aa1, 0xff9da7, 0x9c755f, 0xbab0ab]),
    ("category10", &[0x1f77b4, 0xff7f0e, 0x2ca02c, 0xd62728, 0x9467bd, 0x8c564b, 0xe377c2, 0x7f7f7f, 0xbcbd22, 0x17becf]),
    ("observable10", &[0x4269d0, 0xefb118, 0xff725c, 0x6cc5b0, 0x3ca951, 0xff8ab7, 0xa463f2, 0x97bbf5, 0x9c6b4e, 0x9498a0]),
    ("dark2", &[0x1b9e77, 0xd95f02, 0x7570b3, 0xe7298a, 0x66a61e, 0xe6ab02, 0xa6761d, 0x666666]),
    ("accent", &[0x7fc97f, 0xbeaed4, 0xfdc086, 0xffff99, 0x386cb0, 0xf0027f, 0xbf5b17, 0x666666]),
    ("set1", &[0xe41a1c, 0x377eb8, 0x4daf4a, 0x984ea3, 0xff7f00, 0xffff33, 0xa65628, 0xf781bf, 0x999999]),
    ("set2", &[0x66c2a5, 0xfc8d62, 0x8da0cb, 0xe78ac3, 0xa6d854, 0xffd92f, 0xe5c494, 0xb3b3b3]),
    ("set3", &[0x8dd3c7, 0xffffb3, 0xbebada, 0xfb8072, 0x80b1d3, 0xfdb462, 0xb3de69, 0xfccde5, 0xd9d9d9, 0xbc80bd, 0xccebc5, 0xffed6f]),
    ("paired", &[0xa6cee3, 0x1f78b4, 0xb2df8a, 0x33a02c, 0xfb9a99, 0xe31a1c, 0xfdbf6f, 0xff7f00, 0xcab2d6, 0x6a3d9a, 0xffff99, 0xb15928]),
];

fn table(kind: &ScaleType) -> &'static [(&'static str, &'static [u32])] {
    match kind {
        ScaleType::Diverging => DIVERGING,
        ScaleType::Categorical => CATEGORICAL,
        ScaleType::Sequential | ScaleType::Other(_) => SEQUENTIAL,
    }
}

/// Stops (continuous) or swatches (categorical) of a named scheme.
#[must_use]
pub fn lookup(kind: &ScaleType, name: &str) -> Option<&'static [u32]> {
    table(kind)
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, colors)| *colors)
}

/// Default scheme name for a scale type.
#[must_use]
pub fn default_scheme(kind: &ScaleType) -> &'static str {
    match kind {
        ScaleType::Diverging => DEFAULT_DIVERGING,
        ScaleType::Categorical => DEFAULT_CATEGORICAL,
        ScaleType::Sequential | ScaleType::Other(_) => DEFAULT_SEQUENTIAL,
    }
}

/// Scheme names available for a scale type, in catalog order.
#[must_use]
pub fn available_schemes(kind: &ScaleType) -> Vec<&'static str> {
    table(kind).iter().map(|(name, _)| *name).collect()
}

/// The scale type whose catalog holds `name`, checking sequential, then
/// diverging, then categorical.
#[must_use]
pub fn scale_type_of(name: &str) -> Option<ScaleType> {
    [ScaleType::Sequential, ScaleType::Diverging, ScaleType::Categorical]
        .into_iter()
        .find(|kind| lookup(kind, name).is_some())
}
