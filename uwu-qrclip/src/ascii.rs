use crate::qr_encoder::EncodedQr;

// indexed by top module + 2 * bottom module; blank cells are a plain space,
// not the cp437 non-breaking space
const BLOCKS: [char; 4] = [' ', '▀', '▄', '█'];

/// Renders two module rows per line with half blocks, border included.
///
/// With `invert` the table is reversed so light modules become ink, which
/// reads well on dark terminals. Cells past the bottom/right border then
/// count as dark so a trailing half row disappears into the background.
pub fn render_ascii(qr: &EncodedQr, invert: bool) -> String {
    let border = i64::from(qr.config().border);
    let size = qr.width() as i64;
    let end = size + border;

    let module = |x: i64, y: i64| -> usize {
        if invert && border > 0 && x.max(y) >= end {
            return 1;
        }
        usize::from(qr.is_dark(x, y))
    };

    let mut out = String::new();
    for y in (-border..end).step_by(2) {
        for x in -border..end {
            let mut idx = module(x, y) + (module(x, y + 1) << 1);
            if invert {
                idx = 3 - idx;
            }
            out.push(BLOCKS[idx]);
        }
        out.push('\n');
    }
    out
}
