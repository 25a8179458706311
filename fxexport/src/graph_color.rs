/// The graph colors the profiler UI accepts for markers and tracks.
const PALETTE: [(&str, i64, i64, i64); 10] = [
    ("blue", 0, 112, 243),
    ("green", 16, 185, 129),
    ("grey", 156, 163, 175),
    ("ink", 17, 24, 39),
    ("magenta", 236, 72, 153),
    ("orange", 249, 115, 22),
    ("purple", 168, 85, 247),
    ("red", 239, 68, 68),
    ("teal", 20, 184, 166),
    ("yellow", 234, 179, 8),
];

/// Maps an RGB value to the nearest named graph color. Pure white means
/// "no color override".
pub fn graph_color(rgb: u32) -> Option<&'static str> {
    let r = ((rgb >> 16) & 0xff) as i64;
    let g = ((rgb >> 8) & 0xff) as i64;
    let b = (rgb & 0xff) as i64;

    if r == 0xff && g == 0xff && b == 0xff {
        return None;
    }

    PALETTE
        .iter()
        .min_by_key(|(_, cr, cg, cb)| {
            let dr = r - cr;
            let dg = g - cg;
            let db = b - cb;
            dr * dr + dg * dg + db * db
        })
        .map(|(name, _, _, _)| *name)
}
